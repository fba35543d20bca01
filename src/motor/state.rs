//! Axis state shared with the autosave interrupt.
//!
//! Each accessor enters its own short critical section, so a single field
//! write is atomic with respect to the autosave tick without masking it for
//! longer than the write itself.

use core::cell::RefCell;

use critical_section::Mutex;

use super::axis::{Axis, Direction};

/// Position, validity and recorded direction of every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRecord {
    /// Current value of each axis (mm).
    pub values: [f32; 4],
    /// Whether each axis position can be trusted.
    pub valid: [bool; 4],
    /// Last direction each axis travelled in, used for backlash.
    pub directions: [Direction; 4],
}

impl AxisRecord {
    /// Record at the origin with every position untrusted.
    pub const fn new() -> Self {
        Self {
            values: [0.0; 4],
            valid: [false; 4],
            directions: [Direction::Positive; 4],
        }
    }
}

impl Default for AxisRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis record behind a critical-section mutex.
pub struct SharedAxes {
    inner: Mutex<RefCell<AxisRecord>>,
}

impl SharedAxes {
    /// Shared record at the origin with every position untrusted.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(AxisRecord::new())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut AxisRecord) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Copy of the whole record.
    pub fn snapshot(&self) -> AxisRecord {
        self.with(|record| *record)
    }

    /// Current value of an axis.
    pub fn value(&self, axis: Axis) -> f32 {
        self.with(|record| record.values[axis.index()])
    }

    /// Set the current value of an axis.
    pub fn set_value(&self, axis: Axis, value: f32) {
        self.with(|record| record.values[axis.index()] = value);
    }

    /// Add to the current value of an axis.
    pub fn offset_value(&self, axis: Axis, delta: f32) {
        self.with(|record| record.values[axis.index()] += delta);
    }

    /// Whether the axis position can be trusted.
    pub fn is_valid(&self, axis: Axis) -> bool {
        self.with(|record| record.valid[axis.index()])
    }

    /// Mark the axis position trusted or untrusted.
    pub fn set_valid(&self, axis: Axis, valid: bool) {
        self.with(|record| record.valid[axis.index()] = valid);
    }

    /// Last recorded direction of an axis.
    pub fn direction(&self, axis: Axis) -> Direction {
        self.with(|record| record.directions[axis.index()])
    }

    /// Record the direction an axis travelled in.
    pub fn set_direction(&self, axis: Axis, direction: Direction) {
        self.with(|record| record.directions[axis.index()] = direction);
    }
}

impl Default for SharedAxes {
    fn default() -> Self {
        Self::new()
    }
}
