//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::motor::Axis;

use super::MachineConfig;

/// Validate a machine configuration.
///
/// Checks:
/// - Timer clock and step period are non-zero
/// - Feed rate ranges are positive and non-empty
/// - Motor currents fit the reference output
/// - Bed bands are stacked in ascending order
/// - Segment length and sample count are positive
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    if config.timer.cpu_hz == 0 || config.timer.step_period == 0 {
        return Err(Error::Config(ConfigError::InvalidTimer));
    }

    for axis in Axis::ALL {
        validate_axis(axis, config)?;
    }

    if !config.bed.envelope.is_valid() {
        return Err(Error::Config(ConfigError::InvalidBedBands));
    }

    let segment = config.feeds.segment_length.value();
    if segment.is_nan() || segment <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidSegmentLength(segment)));
    }

    if config.sensing.sample_count == 0 {
        return Err(Error::Config(ConfigError::InvalidSampleCount));
    }

    Ok(())
}

fn validate_axis(axis: Axis, config: &MachineConfig) -> Result<()> {
    let axis_config = config.axes.get(axis);

    for range in [Some(axis_config.feed), axis_config.reverse_feed].into_iter().flatten() {
        if !range.is_valid() {
            return Err(Error::Config(ConfigError::InvalidFeedRange {
                axis,
                min: range.min.value(),
                max: range.max.value(),
            }));
        }
    }

    // Reference voltage must stay within what the PWM output can produce
    let max_amps = config.sensing.mcu_voltage / config.sensing.volts_per_amp;
    for current in [axis_config.idle_current, axis_config.active_current] {
        let amps = current.value();
        if !(0.0..=max_amps).contains(&amps) {
            return Err(Error::Config(ConfigError::InvalidCurrent { axis, amps }));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedRange;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MachineConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_feed_range() {
        let mut config = MachineConfig::default();
        config.axes.z.feed = FeedRange::new(60.0, 30.0);

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidFeedRange { axis: Axis::Z, .. }))
        ));
    }

    #[test]
    fn test_invalid_current() {
        let mut config = MachineConfig::default();
        config.axes.y.active_current = crate::config::units::Amps(12.0);

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidCurrent { axis: Axis::Y, .. }))
        ));
    }

    #[test]
    fn test_invalid_timer() {
        let mut config = MachineConfig::default();
        config.timer.step_period = 0;

        assert_eq!(validate_config(&config), Err(Error::Config(ConfigError::InvalidTimer)));
    }
}
