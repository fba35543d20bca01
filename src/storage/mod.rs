//! Storage module for printer-motion.
//!
//! Non-volatile calibration and position records behind the [`NvStore`]
//! trait, shared between the foreground and the autosave interrupt through
//! [`SharedStorage`].

mod calibration;
pub mod layout;
mod memory;

use core::cell::RefCell;

use critical_section::Mutex;

use crate::error::StorageError;

pub use layout::Field;
pub use memory::MemoryStore;

/// Byte-addressed non-volatile store (EEPROM or emulated flash).
pub trait NvStore {
    /// Device error type.
    type Error: core::fmt::Debug;

    /// Read `buf.len()` bytes starting at `offset`.
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write bytes starting at `offset` without an explicit erase.
    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Erase the affected page region and write bytes starting at `offset`.
    fn erase_and_write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Run `f` with the controller's transient state (address and command
    /// registers, page buffer) saved before and restored after, so a write
    /// issued from an interrupt cannot disturb one the foreground started.
    fn with_preserved_context<R, F>(&mut self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R,
    {
        f(self)
    }
}

/// Store shared between the foreground and interrupt handlers.
///
/// Every access runs inside a critical section.
pub struct SharedStorage<S> {
    inner: Mutex<RefCell<S>>,
}

impl<S: NvStore> SharedStorage<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(store)),
        }
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Run `f` with exclusive access, preserving the controller context.
    pub fn preserving<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.with(|store| store.with_preserved_context(f))
    }

    /// Unwrap the store.
    pub fn into_inner(self) -> S {
        self.inner.into_inner().into_inner()
    }

    /// Read a 4-byte float field.
    pub fn read_f32(&self, field: Field) -> Result<f32, StorageError> {
        self.with(|store| read_f32(store, field))
    }

    /// Read a 2-byte field.
    pub fn read_u16(&self, field: Field) -> Result<u16, StorageError> {
        let mut buf = [0u8; 2];
        self.with(|store| read_into(store, field, &mut buf))?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a 1-byte field.
    pub fn read_u8(&self, field: Field) -> Result<u8, StorageError> {
        self.with(|store| read_u8(store, field))
    }

    /// Erase and rewrite a 4-byte float field.
    pub fn write_f32(&self, field: Field, value: f32) -> Result<(), StorageError> {
        self.with(|store| write_f32(store, field, value))
    }

    /// Write a 2-byte field.
    pub fn write_u16(&self, field: Field, value: u16) -> Result<(), StorageError> {
        self.with(|store| {
            debug_assert_eq!(field.len, 2);
            store
                .erase_and_write(field.offset, &value.to_le_bytes())
                .map_err(|_| StorageError::Access { offset: field.offset })
        })
    }

    /// Write a 1-byte field.
    pub fn write_u8(&self, field: Field, value: u8) -> Result<(), StorageError> {
        self.with(|store| write_u8(store, field, value))
    }
}

pub(crate) fn read_into<S: NvStore>(
    store: &mut S,
    field: Field,
    buf: &mut [u8],
) -> Result<(), StorageError> {
    debug_assert_eq!(field.len as usize, buf.len());
    store
        .read(field.offset, buf)
        .map_err(|_| StorageError::Access { offset: field.offset })
}

pub(crate) fn read_f32<S: NvStore>(store: &mut S, field: Field) -> Result<f32, StorageError> {
    let mut buf = [0u8; 4];
    read_into(store, field, &mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

pub(crate) fn read_u8<S: NvStore>(store: &mut S, field: Field) -> Result<u8, StorageError> {
    let mut buf = [0u8; 1];
    read_into(store, field, &mut buf)?;
    Ok(buf[0])
}

pub(crate) fn write_f32<S: NvStore>(
    store: &mut S,
    field: Field,
    value: f32,
) -> Result<(), StorageError> {
    debug_assert_eq!(field.len, 4);
    store
        .erase_and_write(field.offset, &value.to_le_bytes())
        .map_err(|_| StorageError::Access { offset: field.offset })
}

pub(crate) fn write_u8<S: NvStore>(store: &mut S, field: Field, value: u8) -> Result<(), StorageError> {
    debug_assert_eq!(field.len, 1);
    store
        .write(field.offset, &[value])
        .map_err(|_| StorageError::Access { offset: field.offset })
}
