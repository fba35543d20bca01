//! Move orchestration.
//!
//! A move runs in up to two passes. The validation pass (any task set)
//! resolves targets, rejects step counts that overflow, takes up backlash and
//! splits the move into segments. Each segment is executed by the physical
//! pass (no task set), which arms the step scheduler and parks on the step
//! timer until every axis is idle or an emergency stop is raised.

use embedded_hal::delay::DelayNs;

use crate::config::MachineConfig;
use crate::error::{MotionError, Result};
use crate::geometry::{BedGeometry, Corner};
use crate::hal::{Accelerometer, Board, StepTimer};
use crate::log::{debug, warning};
use crate::motor::{self, AutosaveField, Axis, AxisMask, Direction, MotionState, MotorDriver, SharedAxes};
use crate::storage::SharedStorage;

use super::command::{Mode, MoveCommand, Tasks, Units};
use super::estop::EmergencyStop;
use super::regulation::CurrentRegulator;
use super::scheduler::StepScheduler;
use super::timing::{movement_cycles, StepTiming};

/// Order axes are resolved in, so X/Y limits see the new Z.
const MOVE_ORDER: [Axis; 4] = [Axis::E, Axis::Z, Axis::Y, Axis::X];

/// Resolved physical step of one axis.
#[derive(Debug, Clone, Copy)]
struct AxisStep {
    target: f32,
    direction: Direction,
    total: f32,
    steps_per_mm: f32,
    speed_limit: f32,
}

/// Outcome of the validation pass target resolution.
#[derive(Debug, Clone, Copy)]
struct Resolution {
    resolved: AxisMask,
    reversed: AxisMask,
    directions: [Direction; 4],
}

/// Motion controller for one printer board.
///
/// Owns the driver outputs and peripherals; shares the axis record, the
/// store, the step scheduler and the emergency stop flag with interrupt
/// handlers.
pub struct MotionController<'a, B: Board> {
    pub(crate) driver: MotorDriver<B::Pin, B::Vref, B::Pin>,
    pub(crate) timer: B::Timer,
    pub(crate) current_sense: B::CurrentSense,
    pub(crate) adc_lock: B::AdcLock,
    pub(crate) delay: B::Delay,
    pub(crate) accelerometer: B::Accelerometer,
    pub(crate) axes: &'a SharedAxes,
    pub(crate) storage: &'a SharedStorage<B::Store>,
    pub(crate) scheduler: &'a StepScheduler,
    pub(crate) estop: &'a EmergencyStop,
    pub(crate) state: MotionState,
    pub(crate) bed: BedGeometry,
    pub(crate) bed_height_offset: f32,
    pub(crate) regulator: CurrentRegulator,
    pub(crate) config: MachineConfig,
}

impl<'a, B: Board> MotionController<'a, B> {
    /// Bring the controller into a known state after power-up.
    ///
    /// Blank storage is seeded with the factory calibration first. A failing
    /// accelerometer does not stop initialization; homing reports it later.
    pub fn initialize(&mut self) -> Result<()> {
        if self.storage.steps_per_mm(Axis::X)?.is_nan() {
            warning!("calibration storage is blank, seeding factory values");
            self.storage.seed_factory_defaults(&self.config.factory)?;
        }

        self.restore_state()?;
        self.state = MotionState::new(self.storage.speed_limit(Axis::X, Direction::Positive)?);
        self.axes.set_value(Axis::E, 0.0);

        self.turn_off()?;
        for axis in [Axis::X, Axis::Y] {
            self.driver.set_direction(axis, self.axes.direction(axis))?;
        }
        self.driver.set_idle_currents()?;
        self.reset()?;

        if self.accelerometer.initialize().is_err() {
            warning!("accelerometer initialization failed");
        }
        self.update_bed_changes(false)
    }

    /// Stop stepping, disable the drivers and clear the emergency stop.
    pub fn reset(&mut self) -> Result<()> {
        self.stop_step_timer();
        self.turn_off()?;
        self.estop.clear();
        Ok(())
    }

    /// Enable the motor drivers.
    pub fn turn_on(&mut self) -> Result<()> {
        self.driver.enable()
    }

    /// Disable the motor drivers.
    pub fn turn_off(&mut self) -> Result<()> {
        self.driver.disable()
    }

    /// Whether the motor drivers are enabled.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.driver.is_enabled()
    }

    /// Set the positioning mode of X, Y and Z.
    pub fn set_mode(&mut self, mode: Mode) {
        self.state.mode = mode;
    }

    /// Set the positioning mode of the extruder.
    pub fn set_extruder_mode(&mut self, mode: Mode) {
        self.state.extruder_mode = mode;
    }

    /// Set the units of received commands.
    pub fn set_units(&mut self, units: Units) {
        self.state.units = units;
    }

    /// Set the feed rate in mm/min.
    pub fn set_feed_rate(&mut self, feed_rate: f32) {
        self.state.feed_rate = feed_rate;
    }

    /// Positioning mode of X, Y and Z.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Positioning mode of the extruder.
    #[inline]
    pub fn extruder_mode(&self) -> Mode {
        self.state.extruder_mode
    }

    /// Units of received commands.
    #[inline]
    pub fn units(&self) -> Units {
        self.state.units
    }

    /// Feed rate in mm/min.
    #[inline]
    pub fn feed_rate(&self) -> f32 {
        self.state.feed_rate
    }

    /// Current value of an axis.
    #[inline]
    pub fn position(&self, axis: Axis) -> f32 {
        self.axes.value(axis)
    }

    /// Whether the position of an axis can be trusted.
    #[inline]
    pub fn is_valid(&self, axis: Axis) -> bool {
        self.axes.is_valid(axis)
    }

    /// Fractional steps carried into the next move of an axis.
    #[inline]
    pub fn carry(&self, axis: Axis) -> f32 {
        self.state.carry.get(axis)
    }

    /// Calibrated bed surface.
    #[inline]
    pub fn bed(&self) -> &BedGeometry {
        &self.bed
    }

    /// Global bed height offset loaded from storage.
    #[inline]
    pub fn bed_height_offset(&self) -> f32 {
        self.bed_height_offset
    }

    /// Machine configuration.
    #[inline]
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Motor driver outputs.
    #[inline]
    pub fn driver(&self) -> &MotorDriver<B::Pin, B::Vref, B::Pin> {
        &self.driver
    }

    /// Write one field of an axis record if it changed.
    pub fn save_state(&self, axis: Axis, field: AutosaveField) -> Result<bool> {
        Ok(motor::save_state(self.axes, self.storage, axis, field)?)
    }

    /// Load the persisted axis records.
    pub fn restore_state(&self) -> Result<()> {
        Ok(motor::restore_state(self.axes, self.storage)?)
    }

    /// Start the step timer.
    pub fn start_step_timer(&mut self) {
        self.timer.start();
    }

    /// Stop the step timer and every axis.
    pub fn stop_step_timer(&mut self) {
        self.timer.stop();
        self.scheduler.stop_all();
    }

    /// Execute a move.
    ///
    /// With no task set only the physical pass runs: targets are taken as
    /// they are and the call blocks until the move completes. Otherwise the
    /// move is validated, compensated for backlash and split into segments
    /// first.
    ///
    /// # Errors
    ///
    /// `MotionError::Overflow` leaves every axis untouched.
    /// `MotionError::EmergencyStop` leaves the moved axes invalid.
    pub fn move_axes(&mut self, command: &MoveCommand, tasks: Tasks) -> Result<()> {
        if let Some(feed_rate) = command.feed_rate() {
            self.state.feed_rate = if tasks.contains(Tasks::RECEIVED_COMMAND) {
                self.state.units.to_mm(feed_rate)
            } else {
                feed_rate
            };
        }

        if tasks.is_empty() {
            self.step_to(command)
        } else {
            self.plan(command, tasks)
        }
    }

    /// Move Z to an absolute height at the fastest Z feed rate.
    ///
    /// Mode and feed rate are restored afterwards.
    pub fn move_to_height(&mut self, height: f32) -> Result<()> {
        let saved_mode = self.state.mode;
        let saved_feed_rate = self.state.feed_rate;

        self.state.mode = Mode::Absolute;
        let command = MoveCommand::new()
            .with(Axis::Z, height)
            .feed(self.config.axes.z.feed.max.value());
        let result = self.move_axes(&command, Tasks::BACKLASH);

        self.state.mode = saved_mode;
        self.state.feed_rate = saved_feed_rate;
        result
    }

    /// Reload the bed calibration from storage and rebuild the planes.
    ///
    /// With `adjust_height` Z is shifted so the nozzle keeps its physical
    /// height over the new surface.
    pub fn update_bed_changes(&mut self, adjust_height: bool) -> Result<()> {
        let x = self.axes.value(Axis::X);
        let y = self.axes.value(Axis::Y);
        let previous = self.bed.height_adjustment(x, y) + self.bed_height_offset;

        let mut heights = [0.0; 4];
        for (height, corner) in heights.iter_mut().zip(Corner::ALL) {
            *height = self.storage.corner_height(corner)?;
        }
        let offset = self.storage.bed_height_offset()?;

        self.bed.set_corner_heights(heights);
        self.bed_height_offset = offset;

        if adjust_height {
            self.axes
                .offset_value(Axis::Z, previous - self.bed.height_adjustment(x, y) - offset);
        }
        Ok(())
    }

    /// Resolve a target to absolute millimeters.
    fn resolve(&self, axis: Axis, target: f32, tasks: Tasks) -> Result<f32> {
        let received = tasks.contains(Tasks::RECEIVED_COMMAND);
        let mut target = if received {
            self.state.units.to_mm(target)
        } else {
            target
        };

        if self.state.mode_for(axis) == Mode::Relative {
            target += self.axes.value(axis);
        }

        if received && axis.is_horizontal() {
            let z = self.axes.value(Axis::Z);
            target = self.config.bed.envelope.apply(axis, z, target);
        }
        Ok(target)
    }

    /// Microsteps for a move of `distance` including the carry.
    fn total_steps(&self, axis: Axis, distance: f32, steps_per_mm: f32, reversed: bool) -> Result<f32> {
        let steps = libm::fabsf(distance) * steps_per_mm * self.config.microsteps.factor();
        let total = self.state.carry.total_for(axis, steps, reversed);
        // Also rejects NaN
        if total < u32::MAX as f32 {
            Ok(total)
        } else {
            Err(MotionError::Overflow { axis, steps: total }.into())
        }
    }

    /// Whether the direction pin of an axis points against `direction`.
    fn is_reversal(&self, axis: Axis, direction: Direction) -> bool {
        self.driver.direction(axis).is_some_and(|current| current != direction)
    }

    /// Validation pass.
    fn plan(&mut self, command: &MoveCommand, tasks: Tasks) -> Result<()> {
        let saved_validity = Axis::PERSISTED.map(|axis| self.axes.is_valid(axis));
        let mut resolution = Resolution {
            resolved: AxisMask::NONE,
            reversed: AxisMask::NONE,
            directions: [Direction::Positive; 4],
        };

        if let Err(error) = self.resolve_targets(command, tasks, &mut resolution) {
            for axis in resolution.resolved.iter() {
                self.axes.set_value(axis, self.state.start(axis));
            }
            for (axis, valid) in Axis::PERSISTED.into_iter().zip(saved_validity) {
                self.axes.set_valid(axis, valid);
            }
            return Err(error);
        }

        let mut result = Ok(());
        if tasks.contains(Tasks::BACKLASH) && !resolution.reversed.is_empty() {
            result = self.compensate_for_backlash(resolution.reversed, &resolution.directions);
        }
        if result.is_ok() {
            result = self.split_up_movement(tasks.contains(Tasks::BED_LEVELING));
        }

        for axis in resolution.reversed.iter() {
            self.axes.set_direction(axis, resolution.directions[axis.index()]);
        }

        if !self.estop.is_triggered() {
            for (axis, valid) in Axis::PERSISTED.into_iter().zip(saved_validity) {
                self.axes.set_valid(axis, valid);
            }
        }
        result
    }

    /// Record start values and move every requested axis to its target.
    ///
    /// Axes resolved before a failure are listed in `resolution.resolved`.
    fn resolve_targets(
        &mut self,
        command: &MoveCommand,
        tasks: Tasks,
        resolution: &mut Resolution,
    ) -> Result<()> {
        for axis in MOVE_ORDER {
            let start = self.axes.value(axis);
            self.state.start[axis.index()] = start;

            let Some(target) = command.target(axis) else {
                continue;
            };
            let target = self.resolve(axis, target, tasks)?;

            if target != start {
                let direction = Direction::between(start, target);
                let steps_per_mm = self.storage.steps_per_mm(axis)?;
                let reversed = self.is_reversal(axis, direction);
                let total = self.total_steps(axis, target - start, steps_per_mm, reversed)?;

                // Under one microstep nothing moves, so direction and validity stand
                if total >= 1.0 {
                    if axis.is_horizontal() && self.axes.direction(axis) != direction {
                        resolution.reversed.insert(axis);
                        resolution.directions[axis.index()] = direction;
                    }
                    if axis != Axis::E {
                        self.axes.set_valid(axis, false);
                    }
                }
            }

            self.axes.set_value(axis, target);
            resolution.resolved.insert(axis);
        }
        Ok(())
    }

    /// Take up the mechanical play of X/Y before reversing them.
    ///
    /// Positions, carry, feed rate, mode and direction pins are restored, so
    /// the take-up move leaves no trace in the tracked position.
    fn compensate_for_backlash(&mut self, axes: AxisMask, directions: &[Direction; 4]) -> Result<()> {
        let mut command = MoveCommand::new().feed(self.storage.backlash_speed()?);
        for axis in axes.iter() {
            let distance = self.storage.backlash(axis)?;
            command = command.with(axis, directions[axis.index()].sign() * distance);
        }
        debug!("backlash take-up {}", axes);

        let horizontal = [Axis::X, Axis::Y];
        let values = horizontal.map(|axis| self.axes.value(axis));
        let carry = horizontal.map(|axis| self.state.carry.get(axis));
        let pins = horizontal.map(|axis| self.driver.direction(axis));
        let saved_feed_rate = self.state.feed_rate;
        let saved_mode = self.state.mode;

        for axis in horizontal {
            self.state.carry.set(axis, 0.0);
        }
        self.state.mode = Mode::Relative;
        let result = self.move_axes(&command, Tasks::NONE);

        self.state.mode = saved_mode;
        self.state.feed_rate = saved_feed_rate;
        let mut restored = Ok(());
        for (index, axis) in horizontal.into_iter().enumerate() {
            self.axes.set_value(axis, values[index]);
            self.state.carry.set(axis, carry[index]);
            if let Some(direction) = pins[index] {
                restored = restored.and(self.driver.set_direction(axis, direction));
            }
        }
        result.and(restored)
    }

    /// Re-run the resolved move from its start values as physical passes.
    ///
    /// With bed leveling the horizontal path is cut into segments and Z
    /// follows the bed surface; otherwise the move is a single segment.
    fn split_up_movement(&mut self, leveling: bool) -> Result<()> {
        let start = self.state.start;
        let end = Axis::ALL.map(|axis| self.axes.value(axis));
        for axis in Axis::ALL {
            self.axes.set_value(axis, start[axis.index()]);
        }
        if leveling {
            let adjustment = self.bed.height_adjustment(start[0], start[1]);
            self.axes.offset_value(Axis::Z, adjustment);
        }

        let change = Axis::ALL.map(|axis| end[axis.index()] - start[axis.index()]);
        let horizontal = libm::hypotf(change[0], change[1]);
        let segment_length = self.config.feeds.segment_length.value();
        let segments = if leveling {
            (libm::ceilf(horizontal / segment_length) as u32).max(1)
        } else {
            1
        };

        let saved_modes = (self.state.mode, self.state.extruder_mode);
        self.state.mode = Mode::Absolute;
        self.state.extruder_mode = Mode::Absolute;

        let mut result = Ok(());
        for segment in 1..=segments {
            let last = segment == segments;
            let along = segment as f32 * segment_length;

            let mut command = MoveCommand::new();
            for axis in Axis::ALL {
                let index = axis.index();
                let value = if last {
                    end[index]
                } else {
                    start[index] + along * change[index] / horizontal
                };
                command = command.with(axis, value);
            }
            if leveling {
                let x = command.target(Axis::X).unwrap_or(end[0]);
                let y = command.target(Axis::Y).unwrap_or(end[1]);
                let z = command.target(Axis::Z).unwrap_or(end[2]);
                command = command.with(Axis::Z, z + self.bed.height_adjustment(x, y));
            }

            result = self.move_axes(&command, Tasks::NONE);
            if result.is_err() {
                break;
            }
        }

        self.axes.set_value(Axis::Z, end[Axis::Z.index()]);
        (self.state.mode, self.state.extruder_mode) = saved_modes;
        result
    }

    /// Physical pass.
    fn step_to(&mut self, command: &MoveCommand) -> Result<()> {
        if self.estop.is_triggered() {
            return Err(MotionError::EmergencyStop.into());
        }

        let mut plans: [Option<AxisStep>; 4] = [None; 4];
        for axis in MOVE_ORDER {
            let Some(target) = command.target(axis) else {
                continue;
            };
            let target = self.resolve(axis, target, Tasks::NONE)?;
            let current = self.axes.value(axis);
            if target == current {
                continue;
            }

            let direction = Direction::between(current, target);
            let steps_per_mm = self.storage.steps_per_mm(axis)?;
            let total =
                self.total_steps(axis, target - current, steps_per_mm, self.is_reversal(axis, direction))?;
            plans[axis.index()] = Some(AxisStep {
                target,
                direction,
                total,
                steps_per_mm,
                speed_limit: self.storage.speed_limit(axis, direction)?,
            });
        }

        let extruder_voltage = match plans[Axis::E.index()] {
            Some(_) => Some(self.driver.voltage_for(self.storage.extruder_current()?)),
            None => None,
        };

        let mut steps = [0u32; 4];
        let mut longest = 0.0f64;
        for axis in MOVE_ORDER {
            let Some(plan) = plans[axis.index()] else {
                continue;
            };
            self.driver.set_direction(axis, plan.direction)?;
            self.state.carry.set(axis, plan.total);

            if plan.total >= 1.0 {
                let count = plan.total as u32;
                self.state.carry.consume(axis, count);

                let feed_rate = self
                    .config
                    .axes
                    .get(axis)
                    .feed_range(plan.direction)
                    .clamp(self.state.feed_rate.min(plan.speed_limit));
                let cycles = movement_cycles(
                    count,
                    plan.steps_per_mm,
                    self.config.microsteps,
                    feed_rate,
                    &self.config.timer,
                );
                longest = longest.max(cycles);
                steps[axis.index()] = count;
            }
            self.axes.set_value(axis, plan.target);
        }

        let period = self.config.timer.step_period;
        let mut armed = AxisMask::NONE;
        for axis in Axis::ALL {
            let count = steps[axis.index()];
            if count > 0 && self.scheduler.arm(axis, StepTiming::derive(count, longest, period)) {
                armed.insert(axis);
            }
        }
        if armed.is_empty() {
            return Ok(());
        }

        let result = self.run_armed(armed, extruder_voltage);
        self.stop_step_timer();
        let idle = self.driver.set_idle_currents();
        result.and(idle)
    }

    /// Power the armed axes and wait for the scheduler to finish.
    fn run_armed(&mut self, armed: AxisMask, extruder_voltage: Option<f32>) -> Result<()> {
        for axis in armed.iter() {
            match (axis, extruder_voltage) {
                (Axis::E, Some(volts)) => self.driver.set_voltage(Axis::E, volts)?,
                _ => self.driver.set_active_current(axis)?,
            }
        }
        self.delay.delay_us(self.config.sensing.settle_us);

        self.turn_on()?;
        self.start_step_timer();
        self.park(extruder_voltage)
    }

    /// Park on the step timer until every axis is idle.
    ///
    /// While the extruder steps its current is regulated after each wake.
    fn park(&mut self, extruder_voltage: Option<f32>) -> Result<()> {
        while self.scheduler.any_moving() {
            if self.estop.is_triggered() {
                return Err(MotionError::EmergencyStop.into());
            }
            self.timer.wait();

            if let Some(target) = extruder_voltage {
                if self.scheduler.is_moving(Axis::E) {
                    self.regulator.regulate(
                        &mut self.driver,
                        &mut self.current_sense,
                        &mut self.adc_lock,
                        &mut self.delay,
                        target,
                    )?;
                }
            }
        }
        Ok(())
    }
}
