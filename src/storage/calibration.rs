//! Typed access to calibration records.

use super::layout;
use super::{NvStore, SharedStorage};
use crate::config::units::Amps;
use crate::config::FactoryConfig;
use crate::error::StorageError;
use crate::geometry::Corner;
use crate::motor::{Axis, Direction};

impl<S: NvStore> SharedStorage<S> {
    /// Full steps per millimeter of an axis.
    pub fn steps_per_mm(&self, axis: Axis) -> Result<f32, StorageError> {
        self.read_f32(axis.descriptor().steps_per_mm)
    }

    /// Speed limit of an axis for a direction of travel (mm/min).
    pub fn speed_limit(&self, axis: Axis, direction: Direction) -> Result<f32, StorageError> {
        self.read_f32(axis.descriptor().speed_limit_for(direction))
    }

    /// Backlash distance of an axis, zero for axes without compensation.
    pub fn backlash(&self, axis: Axis) -> Result<f32, StorageError> {
        match axis.descriptor().backlash {
            Some(field) => self.read_f32(field),
            None => Ok(0.0),
        }
    }

    /// Feed rate of the backlash take-up move (mm/min).
    pub fn backlash_speed(&self) -> Result<f32, StorageError> {
        self.read_f32(layout::BACKLASH_SPEED)
    }

    /// Calibrated orientation height of a corner.
    pub fn bed_orientation(&self, corner: Corner) -> Result<f32, StorageError> {
        self.read_f32(layout::bed_orientation(corner))
    }

    /// Store the calibrated orientation height of a corner.
    pub fn set_bed_orientation(&self, corner: Corner, height: f32) -> Result<(), StorageError> {
        self.write_f32(layout::bed_orientation(corner), height)
    }

    /// User offset of a corner.
    pub fn bed_offset(&self, corner: Corner) -> Result<f32, StorageError> {
        self.read_f32(layout::bed_offset(corner))
    }

    /// Store the user offset of a corner.
    pub fn set_bed_offset(&self, corner: Corner, offset: f32) -> Result<(), StorageError> {
        self.write_f32(layout::bed_offset(corner), offset)
    }

    /// Effective corner height: orientation plus user offset.
    pub fn corner_height(&self, corner: Corner) -> Result<f32, StorageError> {
        Ok(self.bed_orientation(corner)? + self.bed_offset(corner)?)
    }

    /// Global bed height offset.
    pub fn bed_height_offset(&self) -> Result<f32, StorageError> {
        self.read_f32(layout::BED_HEIGHT_OFFSET)
    }

    /// Store the global bed height offset.
    pub fn set_bed_height_offset(&self, offset: f32) -> Result<(), StorageError> {
        self.write_f32(layout::BED_HEIGHT_OFFSET, offset)
    }

    /// Offset between the detected touch height and the bed surface.
    pub fn z0_correction(&self) -> Result<f32, StorageError> {
        self.read_f32(layout::Z0_CORRECTION)
    }

    /// Extruder active current.
    pub fn extruder_current(&self) -> Result<Amps, StorageError> {
        self.read_u16(layout::EXTRUDER_CURRENT).map(Amps::from_milliamps)
    }

    /// Homing jerk sensitivity, zero for axes without homing.
    pub fn jerk_sensitivity(&self, axis: Axis) -> Result<u8, StorageError> {
        match axis.descriptor().jerk_sensitivity {
            Some(field) => self.read_u8(field),
            None => Ok(0),
        }
    }

    /// Bed orientation calibration version.
    pub fn bed_orientation_version(&self) -> Result<u8, StorageError> {
        self.read_u8(layout::BED_ORIENTATION_VERSION)
    }

    /// Store the bed orientation calibration version.
    pub fn set_bed_orientation_version(&self, version: u8) -> Result<(), StorageError> {
        self.write_u8(layout::BED_ORIENTATION_VERSION, version)
    }

    /// Write factory calibration to every calibration field.
    ///
    /// Position records are left untouched; a blank record restores as an
    /// invalid position.
    pub fn seed_factory_defaults(&self, factory: &FactoryConfig) -> Result<(), StorageError> {
        for axis in Axis::ALL {
            let descriptor = axis.descriptor();
            self.write_f32(descriptor.steps_per_mm, factory.steps_per_mm[axis.index()])?;
            self.write_f32(descriptor.speed_limit, factory.speed_limits[axis.index()])?;
        }
        self.write_f32(layout::SPEED_LIMIT_E_NEGATIVE, factory.speed_limits[4])?;

        self.write_f32(layout::BACKLASH_X, factory.backlash_x.value())?;
        self.write_f32(layout::BACKLASH_Y, factory.backlash_y.value())?;
        self.write_f32(layout::BACKLASH_SPEED, factory.backlash_speed.value())?;

        for corner in Corner::ALL {
            self.set_bed_orientation(corner, 0.0)?;
            self.set_bed_offset(corner, 0.0)?;
        }
        self.set_bed_height_offset(0.0)?;
        self.write_f32(layout::Z0_CORRECTION, factory.z0_correction.value())?;

        self.write_u16(layout::EXTRUDER_CURRENT, factory.extruder_current_ma)?;
        self.write_u8(layout::JERK_SENSITIVITY_X, factory.jerk_sensitivity[0])?;
        self.write_u8(layout::JERK_SENSITIVITY_Y, factory.jerk_sensitivity[1])?;
        self.set_bed_orientation_version(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn seeded() -> SharedStorage<MemoryStore<128>> {
        let storage = SharedStorage::new(MemoryStore::new());
        storage.seed_factory_defaults(&FactoryConfig::default()).unwrap();
        storage
    }

    #[test]
    fn test_seeded_values() {
        let storage = seeded();
        let factory = FactoryConfig::default();

        assert_eq!(storage.steps_per_mm(Axis::Z).unwrap(), factory.steps_per_mm[2]);
        assert_eq!(
            storage.speed_limit(Axis::E, Direction::Negative).unwrap(),
            factory.speed_limits[4]
        );
        assert_eq!(storage.backlash(Axis::Z).unwrap(), 0.0);
        assert_eq!(storage.jerk_sensitivity(Axis::Y).unwrap(), factory.jerk_sensitivity[1]);
        assert!((storage.extruder_current().unwrap().value() - 0.5).abs() < 1e-6);
        assert_eq!(storage.bed_orientation_version().unwrap(), 0);
    }

    #[test]
    fn test_corner_height_sums_orientation_and_offset() {
        let storage = seeded();
        storage.set_bed_orientation(Corner::FrontLeft, 0.25).unwrap();
        storage.set_bed_offset(Corner::FrontLeft, -0.5).unwrap();

        assert_eq!(storage.corner_height(Corner::FrontLeft).unwrap(), -0.25);
        assert_eq!(storage.corner_height(Corner::BackLeft).unwrap(), 0.0);
    }

    #[test]
    fn test_seed_leaves_position_record_blank() {
        let storage = seeded();
        assert_eq!(storage.read_u8(layout::LAST_VALIDITY_X).unwrap(), 0xFF);
    }
}
