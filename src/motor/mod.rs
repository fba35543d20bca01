//! Motor module for printer-motion.
//!
//! Axis descriptors, driver outputs, and the axis state shared between the
//! foreground and the autosave interrupt.

mod autosave;
mod axis;
mod driver;
mod position;
pub mod state;

pub use autosave::{restore_state, save_field, save_state, Autosave, AutosaveCursor, AutosaveField};
pub use axis::{Axis, AxisDescriptor, AxisMask, Direction, RecordFields};
pub use driver::MotorDriver;
pub use position::{MotionState, StepCarry};
pub use state::{AxisRecord, SharedAxes};
