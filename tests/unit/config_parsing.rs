//! Unit tests for TOML configuration parsing.

use printer_motion::config::MachineConfig;
use printer_motion::{load_config, parse_config, Axis, Direction};

/// Test parsing per-axis motor settings.
#[test]
fn test_parse_axis_config() {
    let toml_str = r#"
[axes.x]
idle_current_amps = 0.5
active_current_amps = 0.8
feed = { min = 100.0, max = 3000.0 }

[axes.y]
idle_current_amps = 0.5
active_current_amps = 0.8
feed = { min = 100.0, max = 3000.0 }

[axes.z]
idle_current_amps = 0.2
active_current_amps = 0.6
feed = { min = 20.0, max = 50.0 }

[axes.e]
idle_current_amps = 0.3
active_current_amps = 0.6
feed = { min = 60.0, max = 500.0 }
reverse_feed = { min = 60.0, max = 900.0 }
"#;

    let config = parse_config(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.axes.x.active_current.value(), 0.8);
    assert_eq!(config.axes.z.feed.max.value(), 50.0);
    assert_eq!(config.axes.x.reverse_feed, None);
    assert_eq!(config.axes.e.feed_range(Direction::Negative).max.value(), 900.0);
    assert_eq!(config.axes.get(Axis::E).feed_range(Direction::Positive).max.value(), 500.0);
}

/// Test parsing bed geometry and detection settings.
#[test]
fn test_parse_bed_and_detection() {
    let toml_str = r#"
[bed]
center_x = 60.0
center_y = 55.0
calibration_distance = 40.0

[detection]
tilt_threshold = 25
z_agreements_required = 3

[feeds]
z_touch = 12.0
"#;

    let config = parse_config(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.bed.center_x.value(), 60.0);
    assert_eq!(config.bed.calibration_distance.value(), 40.0);
    assert_eq!(config.bed.home_to_center_x.value(), 55.0);
    assert_eq!(config.bed.envelope.bands.len(), 3);
    assert_eq!(config.detection.tilt_threshold, 25);
    assert_eq!(config.detection.z_agreements_required, 3);
    assert_eq!(config.detection.consecutive_samples, 2);
    assert_eq!(config.feeds.z_touch.value(), 12.0);
    assert_eq!(config.feeds.homing.value(), 1500.0);
}

/// Test parsing the factory calibration table.
#[test]
fn test_parse_factory_values() {
    let toml_str = r#"
[factory]
steps_per_mm = [20.0, 20.0, 640.0, 130.0]
speed_limits = [1200.0, 1200.0, 50.0, 100.0, 300.0]
jerk_sensitivity = [180, 190]
extruder_current_ma = 450
"#;

    let config = parse_config(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.factory.steps_per_mm[2], 640.0);
    assert_eq!(config.factory.speed_limits[4], 300.0);
    assert_eq!(config.factory.jerk_sensitivity, [180, 190]);
    assert_eq!(config.factory.extruder_current_ma, 450);
    assert_eq!(config.factory.backlash_x.value(), 0.3);
}

/// Test that invalid TOML is reported as a parse error.
#[test]
fn test_invalid_toml_syntax() {
    let result = parse_config("[timer\ncpu_hz = 1");
    assert!(result.is_err());
}

/// Test that an incomplete axis section is rejected.
#[test]
fn test_incomplete_axes_rejected() {
    let toml_str = r#"
[axes.x]
idle_current_amps = 0.5
"#;

    assert!(parse_config(toml_str).is_err());
}

/// Test loading configuration from a file on disk.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join(format!("printer-motion-{}.toml", std::process::id()));
    std::fs::write(&path, "microsteps = 16\n[timer]\nstep_period = 512\n").unwrap();

    let config: MachineConfig = load_config(&path).expect("Failed to load config");
    std::fs::remove_file(&path).ok();

    assert_eq!(config.microsteps.value(), 16);
    assert_eq!(config.timer.step_period, 512);
}

/// Test that a missing file is reported with its path.
#[test]
fn test_load_missing_file() {
    let err = load_config("/nonexistent/printer-motion.toml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/printer-motion.toml"), "{}", err);
}
