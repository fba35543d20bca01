//! # printer-motion
//!
//! Motion-control core of a desktop 3D printer board, built on embedded-hal 1.0.
//!
//! ## Features
//!
//! - **Synchronized stepping**: every axis of a move starts and ends on the
//!   same step-timer tick
//! - **Bed leveling**: Z follows a four-plane model of the calibrated bed
//! - **Backlash compensation**: X/Y play is taken up on direction changes
//! - **Power-loss safe position**: axis records are mirrored into
//!   non-volatile storage one field at a time, rewriting only what changed
//! - **Accelerometer homing**: hard stops and bed contact are detected from
//!   print head vibration
//! - **no_std compatible**: core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use printer_motion::{MotionController, MoveCommand, Tasks, Axis};
//!
//! let mut controller = MotionController::<MyBoard>::builder()
//!     .direction_pins(dir_pins)
//!     .vref(vref_outputs)
//!     .enable_pin(enable)
//!     .timer(step_timer)
//!     .current_sense(sense)
//!     .adc_interlock(interlock)
//!     .delay(delay)
//!     .accelerometer(accelerometer)
//!     .axes(&AXES)
//!     .storage(&STORAGE)
//!     .scheduler(&SCHEDULER)
//!     .emergency_stop(&ESTOP)
//!     .build()?;
//!
//! controller.initialize()?;
//! controller.home_xy(true)?;
//!
//! let command = MoveCommand::new().with(Axis::X, 50.0).feed(1500.0);
//! controller.move_axes(&command, Tasks::RECEIVED_COMMAND | Tasks::BACKLASH)?;
//! ```
//!
//! The step timer interrupt calls [`StepScheduler::tick`] and the autosave
//! timer interrupt calls [`Autosave::on_timer`].
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables TOML configuration loading and host critical sections
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

mod log;

// Core modules
pub mod calibration;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hal;
pub mod motion;
pub mod motor;
pub mod storage;

// Re-exports for ergonomic API
pub use config::{validate_config, MachineConfig};
pub use error::{Error, Result};
pub use geometry::{BedGeometry, Corner};
pub use hal::Board;
pub use motion::{
    EmergencyStop, Mode, MotionController, MotionControllerBuilder, MoveCommand, StepScheduler,
    Tasks, Units,
};
pub use motor::{Autosave, Axis, Direction, SharedAxes};
pub use storage::{MemoryStore, NvStore, SharedStorage};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Amps, Microsteps, Millimeters, MmPerMinute};

impl<'a, B: Board> MotionController<'a, B> {
    /// Create a builder.
    pub fn builder() -> MotionControllerBuilder<'a, B> {
        MotionControllerBuilder::new()
    }
}
