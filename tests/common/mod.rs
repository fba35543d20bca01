//! Simulated printer board.
//!
//! Step pulses move the carriages of a small mechanical model: X and Y stall
//! against hard stops, Z stalls on a (possibly tilted) bed surface, and the
//! accelerometer reports what the print head would feel.

#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin, PinState};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use embedded_hal_mock::eh1::delay::NoopDelay;

use printer_motion::hal::{
    Acceleration, AdcInterlock, Accelerometer, Board, CurrentSense, StepOutputs, StepTimer,
};
use printer_motion::{
    Axis, EmergencyStop, MachineConfig, MemoryStore, MotionController, SharedAxes, SharedStorage,
    StepScheduler,
};

/// Maximum duty cycle of the simulated reference outputs.
pub const MAX_DUTY: u16 = 1000;

/// Timer ticks simulated per wake of the foreground.
pub const TICKS_PER_WAIT: u32 = 8;

/// Acceleration swing reported while a carriage rattles against its stop.
pub const RATTLE: i16 = 300;

/// Y component added while the nozzle presses on the bed.
pub const CONTACT_TILT: i16 = 100;

/// Planar bed surface in world millimeters.
#[derive(Debug, Clone, Copy)]
pub struct BedSurface {
    pub height: f32,
    pub slope_x: f32,
    pub slope_y: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl BedSurface {
    pub fn flat(height: f32) -> Self {
        Self {
            height,
            slope_x: 0.0,
            slope_y: 0.0,
            center_x: 54.0,
            center_y: 50.0,
        }
    }

    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        self.height + self.slope_x * (x - self.center_x) + self.slope_y * (y - self.center_y)
    }
}

/// Mechanical state of the simulated machine.
#[derive(Debug)]
pub struct World {
    /// Carriage positions in microsteps.
    pub positions: [i64; 4],
    /// Microsteps per millimeter of each axis.
    pub scale: [f32; 4],
    pub levels: [PinState; 4],
    pub enabled: bool,
    pub duties: [u16; 4],
    pub timer_running: bool,
    pub ticks: u64,
    pub pulses: [u64; 4],
    pub last_pulse: [u64; 4],
    /// Positive hard stop of each axis in millimeters.
    pub hard_stops: [Option<f32>; 4],
    pub bed: BedSurface,
    pub accelerometer_working: bool,
    pub samples: u64,
    pub sense_reads: u32,
    pub interlock_locked: bool,
    pub interlock_cycles: u32,
    /// Tick at which the emergency stop is raised.
    pub estop_at: Option<u64>,
    pub sensing: (f32, f32, u16),
}

impl World {
    /// Machine at the origin with the scale of `config`'s factory values.
    pub fn new(config: &MachineConfig) -> Self {
        let factor = config.microsteps.factor();
        Self {
            positions: [0; 4],
            scale: config.factory.steps_per_mm.map(|spm| spm * factor),
            levels: [PinState::Low; 4],
            enabled: false,
            duties: [0; 4],
            timer_running: false,
            ticks: 0,
            pulses: [0; 4],
            last_pulse: [0; 4],
            hard_stops: [Some(109.0), Some(105.0), None, None],
            bed: BedSurface::flat(-100.0),
            accelerometer_working: true,
            samples: 0,
            sense_reads: 0,
            interlock_locked: false,
            interlock_cycles: 0,
            estop_at: None,
            sensing: (
                config.sensing.mcu_voltage,
                config.sensing.adc_reference_voltage,
                config.sensing.adc_max,
            ),
        }
    }

    /// Place a carriage at a position in millimeters.
    pub fn place(&mut self, axis: Axis, mm: f32) {
        let index = axis.index();
        self.positions[index] = (mm * self.scale[index]).round() as i64;
    }

    /// Carriage position in millimeters.
    pub fn mm(&self, axis: Axis) -> f32 {
        let index = axis.index();
        self.positions[index] as f32 / self.scale[index]
    }

    fn surface_here(&self) -> f32 {
        self.bed.height_at(self.mm(Axis::X), self.mm(Axis::Y))
    }

    /// Whether the nozzle rests on the bed.
    pub fn in_contact(&self) -> bool {
        let below = (self.positions[Axis::Z.index()] - 1) as f32 / self.scale[Axis::Z.index()];
        below < self.surface_here()
    }

    fn at_stop(&self, axis: Axis) -> bool {
        self.hard_stops[axis.index()].is_some_and(|stop| self.mm(axis) >= stop - 0.5 / self.scale[axis.index()])
    }

    fn step(&mut self, axis: Axis) {
        let index = axis.index();
        self.pulses[index] += 1;
        self.last_pulse[index] = self.ticks;
        if !self.enabled {
            return;
        }

        let negative = self.levels[index] == axis.descriptor().level(printer_motion::Direction::Negative);
        if negative {
            if axis == Axis::Z && self.in_contact() {
                return;
            }
            self.positions[index] -= 1;
        } else {
            if self.at_stop(axis) {
                return;
            }
            self.positions[index] += 1;
        }
    }

    fn sample(&mut self) -> Acceleration {
        self.samples += 1;
        let rattle = if self.samples % 2 == 0 { RATTLE } else { -RATTLE };
        let x = if self.at_stop(Axis::X) { rattle } else { 0 };
        let mut y = if self.at_stop(Axis::Y) { rattle } else { 0 };
        if self.in_contact() {
            y += CONTACT_TILT;
        }
        Acceleration { x, y, z: 1000 }
    }
}

pub type SharedWorld = Rc<RefCell<World>>;

/// Role of a simulated GPIO.
#[derive(Debug, Clone, Copy)]
pub enum PinRole {
    Direction(Axis),
    Enable,
}

pub struct SimPin {
    world: SharedWorld,
    role: PinRole,
}

impl SimPin {
    fn drive(&mut self, state: PinState) {
        let mut world = self.world.borrow_mut();
        match self.role {
            PinRole::Direction(axis) => world.levels[axis.index()] = state,
            PinRole::Enable => world.enabled = state == PinState::Low,
        }
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::High);
        Ok(())
    }
}

pub struct SimPwm {
    world: SharedWorld,
    axis: Axis,
}

impl PwmErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.world.borrow_mut().duties[self.axis.index()] = duty;
        Ok(())
    }
}

struct SimSteps<'w> {
    world: &'w RefCell<World>,
}

impl StepOutputs for SimSteps<'_> {
    fn clear_all(&mut self) {}

    fn pulse(&mut self, axis: Axis) {
        self.world.borrow_mut().step(axis);
    }
}

/// Step timer that runs a burst of interrupts on every wait.
pub struct SimTimer {
    world: SharedWorld,
    scheduler: &'static StepScheduler,
    estop: &'static EmergencyStop,
}

impl StepTimer for SimTimer {
    fn start(&mut self) {
        self.world.borrow_mut().timer_running = true;
    }

    fn stop(&mut self) {
        self.world.borrow_mut().timer_running = false;
    }

    fn wait(&mut self) {
        for _ in 0..TICKS_PER_WAIT {
            let estop_due = {
                let mut world = self.world.borrow_mut();
                if !world.timer_running || !self.scheduler.any_moving() {
                    break;
                }
                world.ticks += 1;
                world.estop_at == Some(world.ticks)
            };
            if estop_due {
                self.estop.trigger();
            }
            self.scheduler.tick(&mut SimSteps { world: &self.world });
        }
    }
}

/// Current sense reading back exactly what the extruder reference drives.
pub struct SimSense {
    world: SharedWorld,
}

impl CurrentSense for SimSense {
    type Error = Infallible;

    fn read_sample(&mut self) -> Result<u16, Self::Error> {
        let mut world = self.world.borrow_mut();
        world.sense_reads += 1;
        let (mcu_voltage, reference, adc_max) = world.sensing;
        let volts = world.duties[Axis::E.index()] as f32 / MAX_DUTY as f32 * mcu_voltage;
        Ok((volts / reference * adc_max as f32).round() as u16)
    }
}

pub struct SimInterlock {
    world: SharedWorld,
}

impl AdcInterlock for SimInterlock {
    fn lock(&mut self) {
        let mut world = self.world.borrow_mut();
        world.interlock_locked = true;
        world.interlock_cycles += 1;
    }

    fn unlock(&mut self) {
        self.world.borrow_mut().interlock_locked = false;
    }
}

pub struct SimAccelerometer {
    world: SharedWorld,
}

impl Accelerometer for SimAccelerometer {
    type Error = ();

    fn initialize(&mut self) -> Result<(), Self::Error> {
        if self.world.borrow().accelerometer_working {
            Ok(())
        } else {
            Err(())
        }
    }

    fn read(&mut self) -> Result<Acceleration, Self::Error> {
        let mut world = self.world.borrow_mut();
        if !world.accelerometer_working {
            return Err(());
        }
        Ok(world.sample())
    }

    fn is_working(&self) -> bool {
        self.world.borrow().accelerometer_working
    }
}

pub type SimStore = MemoryStore<128>;

pub struct SimBoard;

impl Board for SimBoard {
    type Pin = SimPin;
    type Vref = SimPwm;
    type Timer = SimTimer;
    type CurrentSense = SimSense;
    type AdcLock = SimInterlock;
    type Delay = NoopDelay;
    type Accelerometer = SimAccelerometer;
    type Store = SimStore;
}

/// Simulated machine plus the state shared with its interrupts.
pub struct Rig {
    pub world: SharedWorld,
    pub axes: &'static SharedAxes,
    pub storage: &'static SharedStorage<SimStore>,
    pub scheduler: &'static StepScheduler,
    pub estop: &'static EmergencyStop,
}

impl Rig {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            world: Rc::new(RefCell::new(World::new(config))),
            axes: Box::leak(Box::new(SharedAxes::new())),
            storage: Box::leak(Box::new(SharedStorage::new(SimStore::new()))),
            scheduler: Box::leak(Box::new(StepScheduler::new())),
            estop: Box::leak(Box::new(EmergencyStop::new())),
        }
    }

    /// Build and initialize a controller wired to the simulated board.
    pub fn controller(&self, config: MachineConfig) -> MotionController<'static, SimBoard> {
        let world = &self.world;
        let pin = |role| SimPin {
            world: Rc::clone(world),
            role,
        };

        let mut controller = MotionController::<SimBoard>::builder()
            .direction_pins(Axis::ALL.map(|axis| pin(PinRole::Direction(axis))))
            .vref(Axis::ALL.map(|axis| SimPwm {
                world: Rc::clone(world),
                axis,
            }))
            .enable_pin(pin(PinRole::Enable))
            .timer(SimTimer {
                world: Rc::clone(world),
                scheduler: self.scheduler,
                estop: self.estop,
            })
            .current_sense(SimSense {
                world: Rc::clone(world),
            })
            .adc_interlock(SimInterlock {
                world: Rc::clone(world),
            })
            .delay(NoopDelay::new())
            .accelerometer(SimAccelerometer {
                world: Rc::clone(world),
            })
            .axes(self.axes)
            .storage(self.storage)
            .scheduler(self.scheduler)
            .emergency_stop(self.estop)
            .config(config)
            .build()
            .expect("rig components are complete");

        controller.initialize().expect("initialize on simulated board");
        controller
    }

    /// Set a tracked axis and the matching carriage to the same position.
    pub fn place(&self, axis: Axis, mm: f32, valid: bool) {
        self.axes.set_value(axis, mm);
        self.axes.set_valid(axis, valid);
        self.world.borrow_mut().place(axis, mm);
    }

    pub fn world_mm(&self, axis: Axis) -> f32 {
        self.world.borrow().mm(axis)
    }
}
