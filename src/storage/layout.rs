//! Fixed byte layout of the calibration and position records.
//!
//! Every persisted value lives at a fixed offset with a fixed width; there is
//! no schema stored on the device.

use crate::geometry::Corner;
use crate::motor::Axis;

/// A fixed-size field in non-volatile storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    /// First byte of the field.
    pub offset: u16,
    /// Width in bytes.
    pub len: u16,
}

impl Field {
    const fn f32(offset: u16) -> Self {
        Self { offset, len: 4 }
    }

    const fn u16(offset: u16) -> Self {
        Self { offset, len: 2 }
    }

    const fn u8(offset: u16) -> Self {
        Self { offset, len: 1 }
    }

    /// One past the last byte of the field.
    pub const fn end(self) -> u16 {
        self.offset + self.len
    }
}

/// Steps per millimeter, X.
pub const STEPS_PER_MM_X: Field = Field::f32(0);
/// Steps per millimeter, Y.
pub const STEPS_PER_MM_Y: Field = Field::f32(4);
/// Steps per millimeter, Z.
pub const STEPS_PER_MM_Z: Field = Field::f32(8);
/// Steps per millimeter, extruder.
pub const STEPS_PER_MM_E: Field = Field::f32(12);

/// Speed limit, X (mm/min).
pub const SPEED_LIMIT_X: Field = Field::f32(16);
/// Speed limit, Y (mm/min).
pub const SPEED_LIMIT_Y: Field = Field::f32(20);
/// Speed limit, Z (mm/min).
pub const SPEED_LIMIT_Z: Field = Field::f32(24);
/// Speed limit, extruding (mm/min).
pub const SPEED_LIMIT_E_POSITIVE: Field = Field::f32(28);
/// Speed limit, retracting (mm/min).
pub const SPEED_LIMIT_E_NEGATIVE: Field = Field::f32(32);

/// Backlash distance, X.
pub const BACKLASH_X: Field = Field::f32(36);
/// Backlash distance, Y.
pub const BACKLASH_Y: Field = Field::f32(40);
/// Backlash take-up feed rate.
pub const BACKLASH_SPEED: Field = Field::f32(44);

/// Bed orientation, back-right corner.
pub const BED_ORIENTATION_BACK_RIGHT: Field = Field::f32(48);
/// Bed orientation, back-left corner.
pub const BED_ORIENTATION_BACK_LEFT: Field = Field::f32(52);
/// Bed orientation, front-left corner.
pub const BED_ORIENTATION_FRONT_LEFT: Field = Field::f32(56);
/// Bed orientation, front-right corner.
pub const BED_ORIENTATION_FRONT_RIGHT: Field = Field::f32(60);

/// User bed offset, back-right corner.
pub const BED_OFFSET_BACK_RIGHT: Field = Field::f32(64);
/// User bed offset, back-left corner.
pub const BED_OFFSET_BACK_LEFT: Field = Field::f32(68);
/// User bed offset, front-left corner.
pub const BED_OFFSET_FRONT_LEFT: Field = Field::f32(72);
/// User bed offset, front-right corner.
pub const BED_OFFSET_FRONT_RIGHT: Field = Field::f32(76);

/// Global bed height offset.
pub const BED_HEIGHT_OFFSET: Field = Field::f32(80);
/// Correction between the detected touch height and the bed surface.
pub const Z0_CORRECTION: Field = Field::f32(84);

/// Extruder active current (mA).
pub const EXTRUDER_CURRENT: Field = Field::u16(88);
/// Homing jerk sensitivity, X.
pub const JERK_SENSITIVITY_X: Field = Field::u8(90);
/// Homing jerk sensitivity, Y.
pub const JERK_SENSITIVITY_Y: Field = Field::u8(91);
/// Bed orientation calibration version marker.
pub const BED_ORIENTATION_VERSION: Field = Field::u8(92);

/// Last recorded direction, X.
pub const LAST_DIRECTION_X: Field = Field::u8(93);
/// Last recorded direction, Y.
pub const LAST_DIRECTION_Y: Field = Field::u8(94);
/// Last recorded validity, X.
pub const LAST_VALIDITY_X: Field = Field::u8(95);
/// Last recorded validity, Y.
pub const LAST_VALIDITY_Y: Field = Field::u8(96);
/// Last recorded validity, Z.
pub const LAST_VALIDITY_Z: Field = Field::u8(97);
/// Last recorded value, X.
pub const LAST_VALUE_X: Field = Field::f32(100);
/// Last recorded value, Y.
pub const LAST_VALUE_Y: Field = Field::f32(104);
/// Last recorded value, Z.
pub const LAST_VALUE_Z: Field = Field::f32(108);

/// Bytes spanned by the layout.
pub const SIZE: u16 = 112;

/// Version written after a complete bed orientation calibration.
pub const BED_ORIENTATION_VERSION_CURRENT: u8 = 1;

/// Stored validity byte for an untrusted position.
pub const INVALID: u8 = 0;
/// Stored validity byte for a trusted position.
pub const VALID: u8 = 1;

/// Calibrated orientation height of a bed corner.
pub const fn bed_orientation(corner: Corner) -> Field {
    match corner {
        Corner::BackRight => BED_ORIENTATION_BACK_RIGHT,
        Corner::BackLeft => BED_ORIENTATION_BACK_LEFT,
        Corner::FrontLeft => BED_ORIENTATION_FRONT_LEFT,
        Corner::FrontRight => BED_ORIENTATION_FRONT_RIGHT,
    }
}

/// User offset of a bed corner.
pub const fn bed_offset(corner: Corner) -> Field {
    match corner {
        Corner::BackRight => BED_OFFSET_BACK_RIGHT,
        Corner::BackLeft => BED_OFFSET_BACK_LEFT,
        Corner::FrontLeft => BED_OFFSET_FRONT_LEFT,
        Corner::FrontRight => BED_OFFSET_FRONT_RIGHT,
    }
}

/// Every field tied to an axis, for layout checks.
pub(crate) fn axis_fields(axis: Axis) -> impl Iterator<Item = Field> {
    let descriptor = axis.descriptor();
    let record = descriptor.record;
    [
        Some(descriptor.steps_per_mm),
        Some(descriptor.speed_limit),
        descriptor.reverse_speed_limit,
        descriptor.backlash,
        descriptor.jerk_sensitivity,
        record.map(|r| r.value),
        record.map(|r| r.validity),
        record.and_then(|r| r.direction),
    ]
    .into_iter()
    .flatten()
}
