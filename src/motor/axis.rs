//! Axes, directions and the per-axis descriptor table.

use core::fmt;
use core::ops::BitOr;

use embedded_hal::digital::PinState;

use crate::storage::layout::{self, Field};

/// One of the four independently driven axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Print head left/right.
    X,
    /// Bed forward/backward.
    Y,
    /// Bed up/down.
    Z,
    /// Extruder.
    E,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::E];

    /// Axes whose position survives power loss.
    pub const PERSISTED: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of the axis in per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::E => 3,
        }
    }

    /// True for X and Y.
    #[inline]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Axis::X | Axis::Y)
    }

    /// Static description of the axis wiring and storage.
    #[inline]
    pub fn descriptor(self) -> &'static AxisDescriptor {
        &DESCRIPTORS[self.index()]
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::E => "E",
        };
        f.write_str(name)
    }
}

/// Direction of travel along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Toward larger coordinates (right, backward, up, extrude).
    Positive,
    /// Toward smaller coordinates (left, forward, down, retract).
    Negative,
}

impl Direction {
    /// Direction needed to travel from `from` to `to`.
    #[inline]
    pub fn between(from: f32, to: f32) -> Self {
        if to < from {
            Direction::Negative
        } else {
            Direction::Positive
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }

    /// Byte stored in the position record.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => 0,
        }
    }

    /// Decode a stored byte; anything but 0 is positive.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            Direction::Negative
        } else {
            Direction::Positive
        }
    }
}

/// Storage fields of a persisted axis position.
#[derive(Debug, Clone, Copy)]
pub struct RecordFields {
    /// Last known value.
    pub value: Field,
    /// Validity byte.
    pub validity: Field,
    /// Last direction, for axes with backlash compensation.
    pub direction: Option<Field>,
}

/// Static per-axis wiring and storage description.
#[derive(Debug, Clone, Copy)]
pub struct AxisDescriptor {
    /// Direction pin level that drives the axis toward smaller coordinates.
    pub negative_level: PinState,
    /// Steps per millimeter.
    pub steps_per_mm: Field,
    /// Speed limit (positive direction for the extruder).
    pub speed_limit: Field,
    /// Separate speed limit for the negative direction.
    pub reverse_speed_limit: Option<Field>,
    /// Backlash distance.
    pub backlash: Option<Field>,
    /// Homing jerk sensitivity.
    pub jerk_sensitivity: Option<Field>,
    /// Persisted position record.
    pub record: Option<RecordFields>,
}

impl AxisDescriptor {
    /// Direction pin level for a direction of travel.
    #[inline]
    pub fn level(&self, direction: Direction) -> PinState {
        match direction {
            Direction::Negative => self.negative_level,
            Direction::Positive => !self.negative_level,
        }
    }

    /// Speed limit field for a direction of travel.
    #[inline]
    pub fn speed_limit_for(&self, direction: Direction) -> Field {
        match (direction, self.reverse_speed_limit) {
            (Direction::Negative, Some(field)) => field,
            _ => self.speed_limit,
        }
    }
}

static DESCRIPTORS: [AxisDescriptor; 4] = [
    AxisDescriptor {
        negative_level: PinState::High,
        steps_per_mm: layout::STEPS_PER_MM_X,
        speed_limit: layout::SPEED_LIMIT_X,
        reverse_speed_limit: None,
        backlash: Some(layout::BACKLASH_X),
        jerk_sensitivity: Some(layout::JERK_SENSITIVITY_X),
        record: Some(RecordFields {
            value: layout::LAST_VALUE_X,
            validity: layout::LAST_VALIDITY_X,
            direction: Some(layout::LAST_DIRECTION_X),
        }),
    },
    AxisDescriptor {
        negative_level: PinState::Low,
        steps_per_mm: layout::STEPS_PER_MM_Y,
        speed_limit: layout::SPEED_LIMIT_Y,
        reverse_speed_limit: None,
        backlash: Some(layout::BACKLASH_Y),
        jerk_sensitivity: Some(layout::JERK_SENSITIVITY_Y),
        record: Some(RecordFields {
            value: layout::LAST_VALUE_Y,
            validity: layout::LAST_VALIDITY_Y,
            direction: Some(layout::LAST_DIRECTION_Y),
        }),
    },
    AxisDescriptor {
        negative_level: PinState::Low,
        steps_per_mm: layout::STEPS_PER_MM_Z,
        speed_limit: layout::SPEED_LIMIT_Z,
        reverse_speed_limit: None,
        backlash: None,
        jerk_sensitivity: None,
        record: Some(RecordFields {
            value: layout::LAST_VALUE_Z,
            validity: layout::LAST_VALIDITY_Z,
            direction: None,
        }),
    },
    AxisDescriptor {
        negative_level: PinState::High,
        steps_per_mm: layout::STEPS_PER_MM_E,
        speed_limit: layout::SPEED_LIMIT_E_POSITIVE,
        reverse_speed_limit: Some(layout::SPEED_LIMIT_E_NEGATIVE),
        backlash: None,
        jerk_sensitivity: None,
        record: None,
    },
];

/// Set of axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisMask(u8);

impl AxisMask {
    /// No axes.
    pub const NONE: Self = Self(0);
    /// Every axis.
    pub const ALL: Self = Self(0b1111);

    /// Mask with a single axis.
    #[inline]
    pub const fn of(axis: Axis) -> Self {
        Self(1 << axis.index())
    }

    /// Check if an axis is in the set.
    #[inline]
    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    /// Add an axis to the set.
    #[inline]
    pub fn insert(&mut self, axis: Axis) {
        self.0 |= 1 << axis.index();
    }

    /// Remove an axis from the set.
    #[inline]
    pub fn remove(&mut self, axis: Axis) {
        self.0 &= !(1 << axis.index());
    }

    /// Check if the set is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the axes in the set in index order.
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |axis| self.contains(*axis))
    }
}

impl From<Axis> for AxisMask {
    fn from(axis: Axis) -> Self {
        Self::of(axis)
    }
}

impl BitOr for AxisMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<Axis> for AxisMask {
    type Output = Self;

    fn bitor(self, rhs: Axis) -> Self::Output {
        self | Self::of(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_levels() {
        assert_eq!(Axis::X.descriptor().level(Direction::Negative), PinState::High);
        assert_eq!(Axis::X.descriptor().level(Direction::Positive), PinState::Low);
        assert_eq!(Axis::Z.descriptor().level(Direction::Negative), PinState::Low);
        assert_eq!(Axis::E.descriptor().level(Direction::Negative), PinState::High);
    }

    #[test]
    fn test_only_linear_axes_persisted() {
        for axis in Axis::ALL {
            assert_eq!(axis.descriptor().record.is_some(), axis != Axis::E);
        }
        assert!(Axis::Z.descriptor().record.unwrap().direction.is_none());
    }

    #[test]
    fn test_extruder_reverse_speed_limit() {
        let e = Axis::E.descriptor();
        assert_eq!(e.speed_limit_for(Direction::Negative), layout::SPEED_LIMIT_E_NEGATIVE);
        assert_eq!(e.speed_limit_for(Direction::Positive), layout::SPEED_LIMIT_E_POSITIVE);
    }

    #[test]
    fn test_axis_mask() {
        let mut mask = AxisMask::of(Axis::X) | Axis::Z;
        assert!(mask.contains(Axis::X));
        assert!(!mask.contains(Axis::Y));
        mask.remove(Axis::X);
        mask.insert(Axis::E);

        let mut iter = mask.iter();
        assert_eq!(iter.next(), Some(Axis::Z));
        assert_eq!(iter.next(), Some(Axis::E));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_direction_bytes() {
        assert_eq!(Direction::from_byte(Direction::Negative.to_byte()), Direction::Negative);
        assert_eq!(Direction::from_byte(0xFF), Direction::Positive);
        assert_eq!(Direction::between(5.0, 2.0), Direction::Negative);
    }
}
