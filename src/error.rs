//! Error types for printer-motion.
//!
//! Provides unified error handling across configuration, motor hardware,
//! motion planning, sensors and non-volatile storage.

use core::fmt;

use crate::motor::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all printer-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor driver hardware error
    Motor(MotorError),
    /// Move planning or execution error
    Motion(MotionError),
    /// Accelerometer error during homing or calibration
    Sensor(SensorError),
    /// Non-volatile storage error
    Storage(StorageError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Step timer period or clock frequency is zero
    InvalidTimer,
    /// Feed rate range is empty or not positive
    InvalidFeedRange {
        /// Axis the range belongs to
        axis: Axis,
        /// Minimum feed rate in mm/min
        min: f32,
        /// Maximum feed rate in mm/min
        max: f32,
    },
    /// Motor current is negative or exceeds what the reference output can express
    InvalidCurrent {
        /// Axis the current belongs to
        axis: Axis,
        /// Offending current in amps
        amps: f32,
    },
    /// Bed height bands are not stacked in ascending order or have empty extents
    InvalidBedBands,
    /// Segment length must be > 0
    InvalidSegmentLength(f32),
    /// Current-sense sample count must be > 0
    InvalidSampleCount,
    /// A required component was not supplied to a builder
    MissingComponent(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motor driver hardware errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorError {
    /// Direction or enable pin operation failed
    PinError,
    /// Current reference duty-cycle update failed
    PwmError,
    /// Current-sense conversion failed
    SenseError,
}

/// Move planning and execution errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Computed step count does not fit the step counter
    Overflow {
        /// Axis whose step count overflowed
        axis: Axis,
        /// Requested step count
        steps: f32,
    },
    /// Emergency stop was raised while the operation was running
    EmergencyStop,
}

/// Accelerometer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Accelerometer reports that it is not working
    NotWorking,
    /// A sample could not be read
    ReadFailed,
}

/// Non-volatile storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Byte range lies outside the device
    OutOfRange {
        /// First byte of the access
        offset: u16,
        /// Access length in bytes
        len: u16,
    },
    /// Device reported a read/write failure
    Access {
        /// First byte of the access
        offset: u16,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Motion(e) => write!(f, "Motion error: {}", e),
            Error::Sensor(e) => write!(f, "Sensor error: {}", e),
            Error::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidTimer => write!(f, "Timer clock and step period must be > 0"),
            ConfigError::InvalidFeedRange { axis, min, max } => {
                write!(f, "Invalid {} feed range: min ({}) must be > 0 and <= max ({})", axis, min, max)
            }
            ConfigError::InvalidCurrent { axis, amps } => {
                write!(f, "Invalid {} motor current: {} A", axis, amps)
            }
            ConfigError::InvalidBedBands => {
                write!(f, "Bed bands must be stacked by ascending height with non-empty extents")
            }
            ConfigError::InvalidSegmentLength(v) => {
                write!(f, "Invalid segment length: {}. Must be > 0", v)
            }
            ConfigError::InvalidSampleCount => write!(f, "Current-sense sample count must be > 0"),
            ConfigError::MissingComponent(name) => write!(f, "{} is required", name),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
            MotorError::PwmError => write!(f, "Current reference update failed"),
            MotorError::SenseError => write!(f, "Current-sense conversion failed"),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::Overflow { axis, steps } => {
                write!(f, "{} move of {} steps exceeds the step counter", axis, steps)
            }
            MotionError::EmergencyStop => write!(f, "Emergency stop"),
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NotWorking => write!(f, "Accelerometer is not working"),
            SensorError::ReadFailed => write!(f, "Accelerometer sample could not be read"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::OutOfRange { offset, len } => {
                write!(f, "Access of {} bytes at offset {} is out of range", len, offset)
            }
            StorageError::Access { offset } => write!(f, "Device access failed at offset {}", offset),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Error::Sensor(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl Error {
    /// True if this error was caused by an emergency stop.
    pub fn is_emergency_stop(&self) -> bool {
        matches!(self, Error::Motion(MotionError::EmergencyStop))
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for MotionError {}

#[cfg(feature = "std")]
impl std::error::Error for SensorError {}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}
