//! Round-robin persistence of the axis record.
//!
//! Every autosave period one field of one persisted axis is compared with its
//! stored copy and rewritten only when it differs. Nine slots (three axes by
//! three fields) are visited in a fixed cycle, so each field is refreshed
//! about every 1.8 s with the default 200 ms period.

use super::axis::{Axis, Direction};
use super::state::SharedAxes;
use crate::error::StorageError;
use crate::log::debug;
use crate::storage::{self, layout, NvStore, SharedStorage};

/// Field of a persisted axis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutosaveField {
    /// Last direction of travel (X and Y only).
    Direction,
    /// Whether the position can be trusted.
    Validity,
    /// Position value.
    Value,
}

/// Slot the autosave machine visits next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutosaveCursor {
    /// Persisted axis.
    pub axis: Axis,
    /// Field of that axis.
    pub field: AutosaveField,
}

impl AutosaveCursor {
    /// Cursor before the first save; the first slot visited is X direction.
    pub const START: Self = Self {
        axis: Axis::Z,
        field: AutosaveField::Value,
    };

    /// Slot following this one.
    pub const fn next(self) -> Self {
        match self.field {
            AutosaveField::Direction => Self {
                axis: self.axis,
                field: AutosaveField::Validity,
            },
            AutosaveField::Validity => Self {
                axis: self.axis,
                field: AutosaveField::Value,
            },
            AutosaveField::Value => Self {
                axis: match self.axis {
                    Axis::X => Axis::Y,
                    Axis::Y => Axis::Z,
                    _ => Axis::X,
                },
                field: AutosaveField::Direction,
            },
        }
    }
}

impl Default for AutosaveCursor {
    fn default() -> Self {
        Self::START
    }
}

/// Autosave timer state, advanced from the autosave interrupt.
#[derive(Debug, Clone)]
pub struct Autosave {
    cursor: AutosaveCursor,
    counter: u32,
    ticks_per_save: u32,
}

impl Autosave {
    /// Machine that saves one field every `ticks_per_save` interrupts.
    pub const fn new(ticks_per_save: u32) -> Self {
        Self {
            cursor: AutosaveCursor::START,
            counter: 0,
            ticks_per_save: if ticks_per_save == 0 { 1 } else { ticks_per_save },
        }
    }

    /// Slot saved most recently.
    #[inline]
    pub fn cursor(&self) -> AutosaveCursor {
        self.cursor
    }

    /// Autosave interrupt handler.
    ///
    /// Returns whether a byte range was written.
    pub fn on_timer<S: NvStore>(
        &mut self,
        axes: &SharedAxes,
        storage: &SharedStorage<S>,
    ) -> Result<bool, StorageError> {
        self.counter += 1;
        if self.counter < self.ticks_per_save {
            return Ok(false);
        }
        self.counter = 0;
        self.cursor = self.cursor.next();

        let cursor = self.cursor;
        storage.preserving(|store| save_field(axes, store, cursor.axis, cursor.field))
    }
}

/// Write one field of an axis record if it differs from the stored copy.
///
/// Returns whether the field was written. Axes or fields without storage
/// write nothing.
pub fn save_field<S: NvStore>(
    axes: &SharedAxes,
    store: &mut S,
    axis: Axis,
    field: AutosaveField,
) -> Result<bool, StorageError> {
    let Some(record) = axis.descriptor().record else {
        return Ok(false);
    };

    match field {
        AutosaveField::Direction => {
            let Some(slot) = record.direction else {
                return Ok(false);
            };
            let byte = axes.direction(axis).to_byte();
            if storage::read_u8(store, slot)? == byte {
                return Ok(false);
            }
            storage::write_u8(store, slot, byte)?;
        }
        AutosaveField::Validity => {
            let byte = if axes.is_valid(axis) {
                layout::VALID
            } else {
                layout::INVALID
            };
            if storage::read_u8(store, record.validity)? == byte {
                return Ok(false);
            }
            storage::write_u8(store, record.validity, byte)?;
        }
        AutosaveField::Value => {
            let value = axes.value(axis);
            // Bitwise comparison so a stored NaN is replaced
            if storage::read_f32(store, record.value)?.to_bits() == value.to_bits() {
                return Ok(false);
            }
            storage::write_f32(store, record.value, value)?;
        }
    }

    debug!("autosave {} {}", axis, field);
    Ok(true)
}

/// Save one field of an axis record from the foreground.
pub fn save_state<S: NvStore>(
    axes: &SharedAxes,
    storage: &SharedStorage<S>,
    axis: Axis,
    field: AutosaveField,
) -> Result<bool, StorageError> {
    storage.with(|store| save_field(axes, store, axis, field))
}

/// Load every persisted axis record into memory.
///
/// An unprogrammed validity byte restores as invalid, and a value that is not
/// finite restores as zero and invalid.
pub fn restore_state<S: NvStore>(
    axes: &SharedAxes,
    storage: &SharedStorage<S>,
) -> Result<(), StorageError> {
    for axis in Axis::PERSISTED {
        let Some(record) = axis.descriptor().record else {
            continue;
        };

        if let Some(slot) = record.direction {
            axes.set_direction(axis, Direction::from_byte(storage.read_u8(slot)?));
        }

        let valid = storage.read_u8(record.validity)? == layout::VALID;
        let value = storage.read_f32(record.value)?;
        if value.is_finite() {
            axes.set_value(axis, value);
            axes.set_valid(axis, valid);
        } else {
            axes.set_value(axis, 0.0);
            axes.set_valid(axis, false);
        }
    }
    Ok(())
}
