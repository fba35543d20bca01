//! Parsed move commands and the modes they are interpreted in.

use core::ops::BitOr;

use crate::config::units::Millimeters;
use crate::motor::{Axis, AxisMask};

/// Positioning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Targets are absolute coordinates.
    #[default]
    Absolute,
    /// Targets are offsets from the current value.
    Relative,
}

/// Units of received targets and feed rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Units {
    /// Millimeters.
    #[default]
    Millimeters,
    /// Inches.
    Inches,
}

impl Units {
    /// Convert a value in these units to millimeters.
    #[inline]
    pub fn to_mm(self, value: f32) -> f32 {
        match self {
            Units::Millimeters => value,
            Units::Inches => Millimeters::from_inches(value).value(),
        }
    }
}

/// Targets for a subset of axes plus an optional feed rate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveCommand {
    targets: [f32; 4],
    axes: AxisMask,
    feed_rate: Option<f32>,
}

impl MoveCommand {
    /// Command that moves nothing.
    pub const fn new() -> Self {
        Self {
            targets: [0.0; 4],
            axes: AxisMask::NONE,
            feed_rate: None,
        }
    }

    /// Add a target for an axis.
    pub fn with(mut self, axis: Axis, target: f32) -> Self {
        self.targets[axis.index()] = target;
        self.axes.insert(axis);
        self
    }

    /// Set the feed rate (mm/min, or in/min for received commands in inches).
    pub fn feed(mut self, feed_rate: f32) -> Self {
        self.feed_rate = Some(feed_rate);
        self
    }

    /// Target of an axis, if present.
    #[inline]
    pub fn target(&self, axis: Axis) -> Option<f32> {
        self.axes
            .contains(axis)
            .then_some(self.targets[axis.index()])
    }

    /// Axes with a target.
    #[inline]
    pub fn axes(&self) -> AxisMask {
        self.axes
    }

    /// Feed rate, if present.
    #[inline]
    pub fn feed_rate(&self) -> Option<f32> {
        self.feed_rate
    }
}

/// Work to perform around a move.
///
/// An empty set runs a single physical pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tasks(u8);

impl Tasks {
    /// Physical pass only.
    pub const NONE: Self = Self(0);
    /// Command came from the host: apply unit conversion and soft limits.
    pub const RECEIVED_COMMAND: Self = Self(1 << 0);
    /// Take up backlash on X/Y direction changes.
    pub const BACKLASH: Self = Self(1 << 1);
    /// Follow the calibrated bed surface.
    pub const BED_LEVELING: Self = Self(1 << 2);

    /// Check if every task in `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if no task is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Tasks {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
