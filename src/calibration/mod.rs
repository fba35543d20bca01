//! Calibration module for printer-motion.
//!
//! Homing, Z-touch detection and bed calibration, implemented as further
//! operations of [`MotionController`](crate::motion::MotionController).

mod bed;
mod homing;
mod ztouch;

pub use bed::PROBE_CLEARANCE;
pub use ztouch::ZTouchTracker;
