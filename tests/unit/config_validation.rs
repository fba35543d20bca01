//! Unit tests for configuration validation.

use printer_motion::config::{validate_config, FeedRange, MachineConfig};
use printer_motion::error::{ConfigError, Error};
use printer_motion::{parse_config, Axis, MotionController};

use crate::common::{Rig, SimBoard};

/// Test that the stock configuration is valid.
#[test]
fn test_default_config_is_valid() {
    assert!(validate_config(&MachineConfig::default()).is_ok());
}

/// Test that overlapping bed bands are rejected.
#[test]
fn test_overlapping_bands_rejected() {
    let toml_str = r#"
[[bed.envelope.bands]]
z = { min = 0.0, max = 10.0 }
x = { min = 0.0, max = 100.0 }
y = { min = 0.0, max = 100.0 }

[[bed.envelope.bands]]
z = { min = 5.0, max = 50.0 }
x = { min = 0.0, max = 100.0 }
y = { min = 0.0, max = 100.0 }
"#;

    let result = parse_config(toml_str);
    assert_eq!(result.unwrap_err(), Error::Config(ConfigError::InvalidBedBands));
}

/// Test validation fails for an inverted reverse feed range.
#[test]
fn test_inverted_reverse_feed_rejected() {
    let mut config = MachineConfig::default();
    config.axes.e.reverse_feed = Some(FeedRange::new(720.0, 60.0));

    let result = validate_config(&config);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidFeedRange { axis: Axis::E, .. }))
    ));
}

/// Test validation fails for a zero segment length.
#[test]
fn test_zero_segment_length_rejected() {
    let result = parse_config("[feeds]\nsegment_length = 0.0\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidSegmentLength(_)))
    ));
}

/// Test validation fails when no current-sense samples are taken.
#[test]
fn test_zero_sample_count_rejected() {
    let mut config = MachineConfig::default();
    config.sensing.sample_count = 0;

    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidSampleCount))
    );
}

/// Test that the builder refuses an invalid configuration.
#[test]
fn test_builder_validates_config() {
    let mut config = MachineConfig::default();
    config.timer.cpu_hz = 0;

    let result = MotionController::<SimBoard>::builder().config(config).build();
    assert!(matches!(result, Err(Error::Config(ConfigError::InvalidTimer))));
}

/// Test that the builder names the first missing component.
#[test]
fn test_builder_reports_missing_component() {
    let config = MachineConfig::default();
    let rig = Rig::new(&config);

    let result = MotionController::<SimBoard>::builder()
        .axes(rig.axes)
        .storage(rig.storage)
        .build();
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::MissingComponent(_)))
    ));
}
