//! Builder pattern for MotionController.

use crate::config::{validate_config, MachineConfig};
use crate::error::{ConfigError, Error, Result};
use crate::geometry::BedGeometry;
use crate::hal::Board;
use crate::motor::{MotionState, MotorDriver, SharedAxes};
use crate::storage::SharedStorage;

use super::controller::MotionController;
use super::estop::EmergencyStop;
use super::regulation::CurrentRegulator;
use super::scheduler::StepScheduler;

/// Builder for creating MotionController instances.
pub struct MotionControllerBuilder<'a, B: Board> {
    direction_pins: Option<[B::Pin; 4]>,
    vref: Option<[B::Vref; 4]>,
    enable_pin: Option<B::Pin>,
    timer: Option<B::Timer>,
    current_sense: Option<B::CurrentSense>,
    adc_lock: Option<B::AdcLock>,
    delay: Option<B::Delay>,
    accelerometer: Option<B::Accelerometer>,
    axes: Option<&'a SharedAxes>,
    storage: Option<&'a SharedStorage<B::Store>>,
    scheduler: Option<&'a StepScheduler>,
    estop: Option<&'a EmergencyStop>,
    config: MachineConfig,
}

impl<'a, B: Board> Default for MotionControllerBuilder<'a, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, B: Board> MotionControllerBuilder<'a, B> {
    /// Create a new builder with the default machine configuration.
    pub fn new() -> Self {
        Self {
            direction_pins: None,
            vref: None,
            enable_pin: None,
            timer: None,
            current_sense: None,
            adc_lock: None,
            delay: None,
            accelerometer: None,
            axes: None,
            storage: None,
            scheduler: None,
            estop: None,
            config: MachineConfig::default(),
        }
    }

    /// Set the direction pins of X, Y, Z and E.
    pub fn direction_pins(mut self, pins: [B::Pin; 4]) -> Self {
        self.direction_pins = Some(pins);
        self
    }

    /// Set the current reference outputs of X, Y, Z and E.
    pub fn vref(mut self, outputs: [B::Vref; 4]) -> Self {
        self.vref = Some(outputs);
        self
    }

    /// Set the shared driver enable pin.
    pub fn enable_pin(mut self, pin: B::Pin) -> Self {
        self.enable_pin = Some(pin);
        self
    }

    /// Set the step timer.
    pub fn timer(mut self, timer: B::Timer) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Set the extruder current sense channel.
    pub fn current_sense(mut self, sense: B::CurrentSense) -> Self {
        self.current_sense = Some(sense);
        self
    }

    /// Set the temperature interlock.
    pub fn adc_interlock(mut self, lock: B::AdcLock) -> Self {
        self.adc_lock = Some(lock);
        self
    }

    /// Set the delay provider.
    pub fn delay(mut self, delay: B::Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the print head accelerometer.
    pub fn accelerometer(mut self, accelerometer: B::Accelerometer) -> Self {
        self.accelerometer = Some(accelerometer);
        self
    }

    /// Set the axis record shared with the autosave interrupt.
    pub fn axes(mut self, axes: &'a SharedAxes) -> Self {
        self.axes = Some(axes);
        self
    }

    /// Set the non-volatile store shared with the autosave interrupt.
    pub fn storage(mut self, storage: &'a SharedStorage<B::Store>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the step scheduler driven by the step timer interrupt.
    pub fn scheduler(mut self, scheduler: &'a StepScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Set the emergency stop flag.
    pub fn emergency_stop(mut self, estop: &'a EmergencyStop) -> Self {
        self.estop = Some(estop);
        self
    }

    /// Set the machine configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the MotionController.
    ///
    /// The controller still needs
    /// [`initialize`](MotionController::initialize) before the first move.
    ///
    /// # Errors
    ///
    /// Returns an error if a component is missing or the configuration is
    /// invalid.
    pub fn build(self) -> Result<MotionController<'a, B>> {
        validate_config(&self.config)?;

        let config = self.config;
        let driver = MotorDriver::new(
            require(self.direction_pins, "direction_pins")?,
            require(self.vref, "vref")?,
            require(self.enable_pin, "enable_pin")?,
            config.axes.clone(),
            config.sensing.clone(),
        );

        Ok(MotionController {
            driver,
            timer: require(self.timer, "timer")?,
            current_sense: require(self.current_sense, "current_sense")?,
            adc_lock: require(self.adc_lock, "adc_interlock")?,
            delay: require(self.delay, "delay")?,
            accelerometer: require(self.accelerometer, "accelerometer")?,
            axes: require(self.axes, "axes")?,
            storage: require(self.storage, "storage")?,
            scheduler: require(self.scheduler, "scheduler")?,
            estop: require(self.estop, "emergency_stop")?,
            state: MotionState::new(config.axes.x.feed.max.value()),
            bed: BedGeometry::new(&config.bed),
            bed_height_offset: 0.0,
            regulator: CurrentRegulator::new(&config.sensing),
            config,
        })
    }
}

fn require<T>(component: Option<T>, name: &'static str) -> Result<T> {
    component.ok_or(Error::Config(ConfigError::MissingComponent(name)))
}
