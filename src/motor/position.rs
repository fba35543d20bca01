//! Foreground motion state.
//!
//! Tracks the parts of axis state the interrupts never touch: start-of-move
//! values, feed rate, modes, units, and the sub-step carry that keeps
//! fractional steps from being lost between moves.

use super::axis::Axis;
use crate::motion::{Mode, Units};

/// Fractional steps left over from previous moves.
///
/// A move only issues whole steps; the remainder is kept per axis and added
/// to (or, after a direction change, subtracted from) the next move on that
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepCarry([f32; 4]);

impl StepCarry {
    /// Carry of an axis, in steps.
    #[inline]
    pub fn get(&self, axis: Axis) -> f32 {
        self.0[axis.index()]
    }

    /// Replace the carry of an axis.
    #[inline]
    pub fn set(&mut self, axis: Axis, steps: f32) {
        self.0[axis.index()] = steps;
    }

    /// Steps for a move of `steps` microsteps including the carry.
    #[inline]
    pub fn total_for(&self, axis: Axis, steps: f32, direction_change: bool) -> f32 {
        if direction_change {
            steps - self.get(axis)
        } else {
            steps + self.get(axis)
        }
    }

    /// Remove issued whole steps from the carry.
    #[inline]
    pub fn consume(&mut self, axis: Axis, steps: u32) {
        self.0[axis.index()] -= steps as f32;
    }
}

/// Foreground-only motion state.
#[derive(Debug, Clone)]
pub struct MotionState {
    /// Value of each axis when the current move began.
    pub start: [f32; 4],
    /// Commanded feed rate (mm/min).
    pub feed_rate: f32,
    /// Positioning mode of X, Y and Z.
    pub mode: Mode,
    /// Positioning mode of the extruder.
    pub extruder_mode: Mode,
    /// Units of received commands.
    pub units: Units,
    /// Sub-step carry.
    pub carry: StepCarry,
}

impl MotionState {
    /// Absolute millimeter state at the given feed rate.
    pub fn new(feed_rate: f32) -> Self {
        Self {
            start: [0.0; 4],
            feed_rate,
            mode: Mode::Absolute,
            extruder_mode: Mode::Absolute,
            units: Units::Millimeters,
            carry: StepCarry::default(),
        }
    }

    /// Positioning mode that applies to an axis.
    #[inline]
    pub fn mode_for(&self, axis: Axis) -> Mode {
        match axis {
            Axis::E => self.extruder_mode,
            _ => self.mode,
        }
    }

    /// Start-of-move value of an axis.
    #[inline]
    pub fn start(&self, axis: Axis) -> f32 {
        self.start[axis.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carry_direction_change() {
        let mut carry = StepCarry::default();
        carry.set(Axis::X, 0.25);

        assert_eq!(carry.total_for(Axis::X, 10.0, false), 10.25);
        assert_eq!(carry.total_for(Axis::X, 10.0, true), 9.75);
    }

    #[test]
    fn test_carry_consume_keeps_fraction() {
        let mut carry = StepCarry::default();
        let total = carry.total_for(Axis::Y, 100.6, false);
        carry.set(Axis::Y, total);
        carry.consume(Axis::Y, total as u32);

        let left = carry.get(Axis::Y);
        assert!((0.0..1.0).contains(&left));
        assert!((left - 0.6).abs() < 1e-4);
    }

    #[test]
    fn test_extruder_mode_is_separate() {
        let mut state = MotionState::new(1500.0);
        state.extruder_mode = Mode::Relative;

        assert_eq!(state.mode_for(Axis::E), Mode::Relative);
        assert_eq!(state.mode_for(Axis::Z), Mode::Absolute);
    }
}
