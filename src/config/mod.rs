//! Configuration module for printer-motion.
//!
//! Provides the machine description (timers, bed envelope, motor currents,
//! detection thresholds and factory calibration) loaded from TOML files
//! (with `std` feature) or built from defaults.

mod limits;
mod motor;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use limits::{BedBand, BedEnvelope, Extent};
pub use motor::{AxesConfig, AxisConfig, FeedRange};
pub use system::{
    BedConfig, DetectionConfig, FactoryConfig, FeedsConfig, MachineConfig, SensingConfig,
    TimerConfig,
};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Amps, Microsteps, Millimeters, MmPerMinute};
