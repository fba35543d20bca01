//! Z-touch detection.
//!
//! Z is lowered at a slow feed rate until the print head tilts against the
//! bed. Touches are repeated until consecutive heights agree.

use embedded_hal::delay::DelayNs;

use crate::error::{MotionError, Result};
use crate::hal::{Board, StepTimer};
use crate::log::{debug, info};
use crate::motion::{movement_cycles, MotionController, StepTiming};
use crate::motor::{Axis, Direction};

/// Agreement check over successive touch heights.
#[derive(Debug, Clone, PartialEq)]
pub struct ZTouchTracker {
    last: f32,
    matches: u8,
    agreement: f32,
    required: u8,
}

impl ZTouchTracker {
    /// Tracker whose first comparison is against `start`.
    pub fn new(start: f32, agreement: f32, required: u8) -> Self {
        Self {
            last: start,
            matches: 0,
            agreement,
            required: required.max(1),
        }
    }

    /// Record a touch height. Returns `true` once enough consecutive touches
    /// agree with their predecessor.
    pub fn record(&mut self, height: f32) -> bool {
        if libm::fabsf(self.last - height) <= self.agreement {
            self.matches += 1;
            if self.matches >= self.required {
                return true;
            }
        } else {
            self.matches = 0;
        }
        self.last = height;
        false
    }

    /// Height of the previous touch.
    #[inline]
    pub fn last(&self) -> f32 {
        self.last
    }
}

impl<'a, B: Board> MotionController<'a, B> {
    /// Lower Z until it rests on the bed and set Z to the touch height.
    ///
    /// Z is invalid while searching; its previous validity is restored
    /// unless an emergency stop was raised.
    pub fn move_to_z0(&mut self) -> Result<()> {
        let was_valid = self.axes.is_valid(Axis::Z);
        self.axes.set_valid(Axis::Z, false);

        let result = self.find_z0();
        let idle = self.driver.set_idle_currents();

        if !self.estop.is_triggered() {
            self.axes.set_valid(Axis::Z, was_valid);
        }
        result.and(idle)
    }

    fn find_z0(&mut self) -> Result<()> {
        let ceiling = self.axes.value(Axis::Z);
        let detection = &self.config.detection;
        let mut tracker = ZTouchTracker::new(
            ceiling,
            detection.z_agreement.value(),
            detection.z_agreements_required,
        );
        let retract = detection.z_retract.value();

        loop {
            if self.estop.is_triggered() {
                return Err(MotionError::EmergencyStop.into());
            }

            let height = self.touch_bed()?;
            debug!("Z touch at {}", height);

            if tracker.record(height) {
                let correction = self.storage.z0_correction()?;
                self.move_to_height(height + correction)?;
                self.axes.offset_value(Axis::Z, -correction);
                info!("Z0 found at {}", height);
                return Ok(());
            }

            self.move_to_height((height + retract).min(ceiling))?;
        }
    }

    /// Lower Z once until contact and return the resulting Z value.
    fn touch_bed(&mut self) -> Result<f32> {
        let steps_per_mm = self.storage.steps_per_mm(Axis::Z)?;
        let microsteps = self.config.microsteps;
        let feed_rate = self.config.feeds.z_touch.value();

        self.driver.set_direction(Axis::Z, Direction::Negative)?;
        self.state.carry.set(Axis::Z, 0.0);
        let cycles = movement_cycles(u32::MAX, steps_per_mm, microsteps, feed_rate, &self.config.timer);
        self.scheduler.arm(
            Axis::Z,
            StepTiming::derive(u32::MAX, cycles, self.config.timer.step_period),
        );

        self.driver.set_active_current(Axis::Z)?;
        self.turn_on()?;
        self.delay.delay_ms(self.config.detection.still_settle_ms);

        let result = self.watch_for_contact();
        self.stop_step_timer();

        let travelled = (u32::MAX - self.scheduler.remaining_steps(Axis::Z)) as f32;
        self.axes
            .offset_value(Axis::Z, -travelled / (steps_per_mm * microsteps.factor()));
        result?;
        Ok(self.axes.value(Axis::Z))
    }

    /// Step Z down until the head tilts against the bed.
    fn watch_for_contact(&mut self) -> Result<()> {
        let still = self.read_acceleration()?.y;
        let threshold = self.config.detection.tilt_threshold as i32;
        let required = self.config.detection.consecutive_samples;

        self.start_step_timer();
        let mut counter = 0u8;
        while self.scheduler.is_moving(Axis::Z) {
            if self.estop.is_triggered() {
                return Err(MotionError::EmergencyStop.into());
            }
            self.timer.wait();

            let sample = self.read_acceleration()?.y;
            if (still as i32 - sample as i32).abs() >= threshold {
                counter += 1;
                if counter >= required {
                    self.scheduler.halt(Axis::Z);
                }
            } else {
                counter = 0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_on_second_agreement() {
        let mut tracker = ZTouchTracker::new(65.0, 1.0, 2);

        assert!(!tracker.record(62.3));
        assert!(!tracker.record(61.98));
        assert!(tracker.record(61.55));
    }

    #[test]
    fn test_disagreement_resets_matches() {
        let mut tracker = ZTouchTracker::new(10.0, 1.0, 2);

        assert!(!tracker.record(9.5));
        assert!(!tracker.record(7.0));
        assert!(!tracker.record(6.8));
        assert!(tracker.record(6.9));
        assert_eq!(tracker.last(), 6.8);
    }

    #[test]
    fn test_boundary_agreement() {
        let mut tracker = ZTouchTracker::new(2.0, 1.0, 1);
        assert!(tracker.record(1.0));
    }
}
