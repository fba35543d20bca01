//! Accelerometer-assisted X/Y homing.
//!
//! Each horizontal axis is driven into its hard stop at the homing feed rate.
//! The print head accelerometer shows the impact as a run of large
//! sample-to-sample changes, which halts the axis.

use embedded_hal::delay::DelayNs;

use crate::config::Extent;
use crate::error::{Error, MotionError, Result, SensorError};
use crate::hal::{Acceleration, Accelerometer, Board, StepTimer};
use crate::log::info;
use crate::motion::{movement_cycles, Mode, MotionController, MoveCommand, StepTiming, Tasks};
use crate::motor::{Axis, Direction};

impl<'a, B: Board> MotionController<'a, B> {
    /// Home X and Y against their hard stops and park at the bed center.
    ///
    /// With `adjust_height` Z follows the bed surface from the stop to the
    /// center. X and Y become valid and Z validity is restored unless an
    /// emergency stop was raised.
    ///
    /// # Errors
    ///
    /// `SensorError::NotWorking` or `SensorError::ReadFailed` when the
    /// accelerometer cannot be sampled, `MotionError::EmergencyStop` when
    /// stopped.
    pub fn home_xy(&mut self, adjust_height: bool) -> Result<()> {
        self.axes.set_valid(Axis::X, false);
        self.axes.set_valid(Axis::Y, false);

        for axis in [Axis::Y, Axis::X] {
            self.seek_hard_stop(axis)?;
        }
        self.return_to_center(adjust_height)?;

        if !self.estop.is_triggered() {
            self.axes.set_valid(Axis::X, true);
            self.axes.set_valid(Axis::Y, true);
        }
        info!("homed X/Y");
        Ok(())
    }

    /// Latest accelerometer sample.
    pub(crate) fn read_acceleration(&mut self) -> Result<Acceleration> {
        if !self.accelerometer.is_working() {
            return Err(SensorError::NotWorking.into());
        }
        self.accelerometer
            .read()
            .map_err(|_| Error::Sensor(SensorError::ReadFailed))
    }

    /// Drive an axis in the positive direction until it hits the hard stop.
    fn seek_hard_stop(&mut self, axis: Axis) -> Result<()> {
        let extent = self
            .config
            .bed
            .envelope
            .overall(axis)
            .unwrap_or(Extent::new(0.0, 0.0));
        let distance = extent.span() + self.config.bed.homing_overshoot.value();

        self.driver.set_direction(axis, Direction::Positive)?;
        self.axes.set_direction(axis, Direction::Positive);
        self.driver.set_active_current(axis)?;

        let threshold = self
            .config
            .detection
            .jerk_max
            .saturating_sub(self.storage.jerk_sensitivity(axis)?) as i32;

        let steps_per_mm = self.storage.steps_per_mm(axis)?;
        let microsteps = self.config.microsteps;
        let steps = (libm::ceilf(distance * steps_per_mm * microsteps.factor()) as u32).max(1);
        self.state.carry.set(axis, 0.0);

        let feed_rate = self.config.feeds.homing.value();
        let cycles = movement_cycles(steps, steps_per_mm, microsteps, feed_rate, &self.config.timer);
        self.scheduler
            .arm(axis, StepTiming::derive(steps, cycles, self.config.timer.step_period));

        self.delay.delay_us(self.config.sensing.settle_us);
        self.turn_on()?;
        self.start_step_timer();

        let result = self.watch_for_impact(axis, threshold);
        self.stop_step_timer();
        let idle = self.driver.set_idle_currents();
        result.and(idle)
    }

    /// Sample the accelerometer until the axis stops or hits the stop.
    fn watch_for_impact(&mut self, axis: Axis, threshold: i32) -> Result<()> {
        let required = self.config.detection.consecutive_samples;
        let mut last = self.read_acceleration()?.along(axis);
        let mut counter = 0u8;

        while self.scheduler.is_moving(axis) {
            if self.estop.is_triggered() {
                return Err(MotionError::EmergencyStop.into());
            }
            self.timer.wait();

            let sample = self.read_acceleration()?.along(axis);
            if (last as i32 - sample as i32).abs() >= threshold {
                counter += 1;
                if counter >= required {
                    self.scheduler.halt(axis);
                }
            } else {
                counter = 0;
            }
            last = sample;
        }
        Ok(())
    }

    /// Back off from the stops to the bed center.
    fn return_to_center(&mut self, adjust_height: bool) -> Result<()> {
        let center_x = self.config.bed.center_x.value();
        let center_y = self.config.bed.center_y.value();
        let was_z_valid = self.axes.is_valid(Axis::Z);

        let mut lift = 0.0;
        if adjust_height {
            lift = self.bed.height_adjustment(center_x, center_y)
                - self
                    .bed
                    .height_adjustment(self.axes.value(Axis::X), self.axes.value(Axis::Y));
            self.axes.set_valid(Axis::Z, false);
        }

        let saved_mode = self.state.mode;
        let saved_z = self.axes.value(Axis::Z);
        let saved_feed_rate = self.state.feed_rate;
        self.state.mode = Mode::Relative;

        let to_x = MoveCommand::new()
            .with(Axis::X, -self.config.bed.home_to_center_x.value())
            .feed(self.config.axes.x.feed.max.value());
        let to_y = MoveCommand::new()
            .with(Axis::Y, -self.config.bed.home_to_center_y.value())
            .with(Axis::Z, lift);

        let mut result = self.move_axes(&to_x, Tasks::BACKLASH);
        if result.is_ok() {
            result = self.move_axes(&to_y, Tasks::BACKLASH);
        }

        self.axes.set_value(Axis::X, center_x);
        self.axes.set_value(Axis::Y, center_y);
        self.axes.set_value(Axis::Z, saved_z);
        self.state.feed_rate = saved_feed_rate;
        self.state.mode = saved_mode;

        if !self.estop.is_triggered() {
            self.axes.set_valid(Axis::Z, was_z_valid);
        }
        result
    }
}
