//! Hardware seams.
//!
//! Digital outputs, PWM and delays come straight from embedded-hal 1.0. The
//! remaining peripherals the motion core drives (step timer, current sense,
//! temperature interlock, accelerometer) are small traits implemented by the
//! board support code, tied together by [`Board`].

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::motor::Axis;
use crate::storage::NvStore;

/// Step pulse outputs driven from the step timer interrupt.
pub trait StepOutputs {
    /// Drive every step output low.
    fn clear_all(&mut self);

    /// Drive the step output of an axis high.
    fn pulse(&mut self, axis: Axis);
}

/// Step outputs backed by four GPIO pins in axis order.
pub struct StepPins<P: OutputPin> {
    pins: [P; 4],
}

impl<P: OutputPin> StepPins<P> {
    /// Wrap the step pins of X, Y, Z and E.
    pub fn new(pins: [P; 4]) -> Self {
        Self { pins }
    }

    /// Release the pins.
    pub fn into_inner(self) -> [P; 4] {
        self.pins
    }
}

// Runs in the step timer interrupt, which has no caller to hand a pin error
// to; a failed write on one axis must not stop the others.
impl<P: OutputPin> StepOutputs for StepPins<P> {
    fn clear_all(&mut self) {
        for pin in &mut self.pins {
            pin.set_low().ok();
        }
    }

    fn pulse(&mut self, axis: Axis) {
        self.pins[axis.index()].set_high().ok();
    }
}

/// Periodic step timer whose interrupt calls
/// [`StepScheduler::tick`](crate::motion::StepScheduler::tick).
pub trait StepTimer {
    /// Restart the counter and enable the interrupt.
    fn start(&mut self);

    /// Stop the counter.
    fn stop(&mut self);

    /// Park until the next interrupt of any source (e.g. `wfi`).
    fn wait(&mut self);
}

/// Extruder current-sense ADC channel.
pub trait CurrentSense {
    /// Conversion error type.
    type Error: Debug;

    /// Run one conversion and return the raw 12-bit result.
    fn read_sample(&mut self) -> Result<u16, Self::Error>;
}

/// Access to the ADC shared with the temperature subsystem.
pub trait AdcInterlock {
    /// Mask the temperature update interrupt.
    fn lock(&mut self);

    /// Unmask the temperature update interrupt.
    fn unlock(&mut self);
}

/// One raw three-axis accelerometer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Acceleration {
    /// X component.
    pub x: i16,
    /// Y component.
    pub y: i16,
    /// Z component.
    pub z: i16,
}

impl Acceleration {
    /// Component measured along a motion axis.
    ///
    /// The extruder has no matching component and reads as zero.
    pub fn along(&self, axis: Axis) -> i16 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::E => 0,
        }
    }
}

/// Three-axis accelerometer mounted on the print head.
pub trait Accelerometer {
    /// Bus error type.
    type Error: Debug;

    /// Configure the device.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Read the latest sample.
    fn read(&mut self) -> Result<Acceleration, Self::Error>;

    /// Whether the device responded during initialization and since.
    fn is_working(&self) -> bool;
}

/// Peripheral types of a printer board.
pub trait Board {
    /// Direction and enable pins.
    type Pin: OutputPin;
    /// Current reference outputs.
    type Vref: SetDutyCycle;
    /// Step timer.
    type Timer: StepTimer;
    /// Extruder current sense.
    type CurrentSense: CurrentSense;
    /// Temperature interlock.
    type AdcLock: AdcInterlock;
    /// Blocking delays.
    type Delay: DelayNs;
    /// Print head accelerometer.
    type Accelerometer: Accelerometer;
    /// Non-volatile calibration store.
    type Store: NvStore;
}
