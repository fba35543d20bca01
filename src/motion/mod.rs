//! Motion module for printer-motion.
//!
//! Move commands, step timing, the interrupt-driven step scheduler and the
//! controller that ties them to the motor drivers.

mod builder;
mod command;
mod controller;
mod estop;
mod regulation;
mod scheduler;
mod timing;

pub use builder::MotionControllerBuilder;
pub use command::{Mode, MoveCommand, Tasks, Units};
pub use controller::MotionController;
pub use estop::EmergencyStop;
pub use regulation::CurrentRegulator;
pub use scheduler::StepScheduler;
pub use timing::{movement_cycles, StepTiming};
