//! Machine description files (std only).
//!
//! A machine description is a TOML file whose sections mirror
//! [`MachineConfig`]: `[timer]`, `[axes.*]`, `[bed]` with its envelope
//! bands, `[detection]`, `[feeds]` and the `[factory]` calibration table.
//! Every section is optional and falls back to the stock printer.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::MachineConfig;

/// Read and validate a machine description from disk.
///
/// # Errors
///
/// `ConfigError::IoError` names the file when it cannot be read. Parse and
/// validation failures are reported as by [`parse_config`].
///
/// # Example
///
/// ```rust,ignore
/// use printer_motion::load_config;
///
/// let config = load_config("printer.toml")?;
/// let controller = MotionController::new(config, board, storage, estop)?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MachineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        let msg = truncated(format_args!("{}: {}", path.display(), e));
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse and validate a machine description.
///
/// # Errors
///
/// `ConfigError::ParseError` carries the line of the offending entry when
/// the TOML does not match the machine layout; any validation error from
/// [`validate_config`](super::validate_config) is returned as is.
pub fn parse_config(content: &str) -> Result<MachineConfig> {
    let config: MachineConfig = toml::from_str(content).map_err(|e| {
        let msg = match e.span() {
            Some(span) => {
                let line = content.get(..span.start).unwrap_or(content).matches('\n').count() + 1;
                truncated(format_args!("line {}: {}", line, e.message()))
            }
            None => truncated(format_args!("{}", e.message())),
        };
        Error::Config(ConfigError::ParseError(msg))
    })?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

/// Render into a fixed-capacity message, keeping the longest prefix that fits.
fn truncated(args: core::fmt::Arguments<'_>) -> heapless::String<128> {
    let rendered = std::fmt::format(args);
    let mut msg = heapless::String::new();
    for c in rendered.chars() {
        if msg.push(c).is_err() {
            break;
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.timer.step_period, 1024);
        assert_eq!(config.microsteps.value(), 8);
        assert_eq!(config.bed.envelope.bands.len(), 3);
    }

    #[test]
    fn test_parse_timer_override() {
        let toml = r#"
microsteps = 16

[timer]
cpu_hz = 16000000
step_period = 256
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.timer.cpu_hz, 16_000_000);
        assert_eq!(config.timer.step_period, 256);
        assert_eq!(config.timer.autosave_interval_ms, 200);
        assert_eq!(config.microsteps.value(), 16);
    }

    #[test]
    fn test_custom_envelope_clamps_targets() {
        let toml = r#"
[[bed.envelope.bands]]
z = { min = 0.0, max = 50.0 }
x = { min = 0.0, max = 100.0 }
y = { min = 0.0, max = 90.0 }
"#;

        let config = parse_config(toml).unwrap();
        let envelope = &config.bed.envelope;
        assert_eq!(envelope.bands.len(), 1);
        assert_eq!(envelope.apply(crate::Axis::X, 10.0, 150.0), 100.0);
        assert_eq!(envelope.apply(crate::Axis::Y, 10.0, -5.0), 0.0);
        assert_eq!(envelope.apply(crate::Axis::Y, 10.0, 45.0), 45.0);
    }

    #[test]
    fn test_parse_rejects_bad_microsteps() {
        let result = parse_config("microsteps = 3");
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_parse_error_names_line() {
        let result = parse_config("microsteps = 16\n\n[timer\nstep_period = 512\n");
        let Err(Error::Config(ConfigError::ParseError(msg))) = result else {
            panic!("expected a parse error, got {:?}", result);
        };
        assert!(msg.starts_with("line 3:"), "{}", msg);
    }

    #[test]
    fn test_missing_file_error_names_path() {
        let result = load_config("/nonexistent/printer.toml");
        let Err(Error::Config(ConfigError::IoError(msg))) = result else {
            panic!("expected an I/O error, got {:?}", result);
        };
        assert!(msg.starts_with("/nonexistent/printer.toml: "), "{}", msg);
    }

    #[test]
    fn test_long_message_is_truncated() {
        let long = "x".repeat(300);
        assert_eq!(truncated(format_args!("{}", long)).len(), 128);
    }
}
