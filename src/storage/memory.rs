//! RAM-backed store.
//!
//! Used by host simulations and tests; counts writes per byte so wear
//! behaviour can be checked.

use super::NvStore;
use crate::error::StorageError;

/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

/// RAM-backed [`NvStore`] with write instrumentation.
#[derive(Debug, Clone)]
pub struct MemoryStore<const N: usize = 128> {
    bytes: [u8; N],
    writes: [u32; N],
    context_saves: u32,
}

impl<const N: usize> MemoryStore<N> {
    /// Blank (fully erased) store.
    pub const fn new() -> Self {
        Self {
            bytes: [ERASED; N],
            writes: [0; N],
            context_saves: 0,
        }
    }

    /// Raw contents.
    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Number of writes that touched the byte at `offset`.
    pub fn writes_at(&self, offset: u16) -> u32 {
        self.writes.get(offset as usize).copied().unwrap_or(0)
    }

    /// Total number of byte writes.
    pub fn total_writes(&self) -> u32 {
        self.writes.iter().sum()
    }

    /// Number of times the controller context was saved and restored.
    pub fn context_saves(&self) -> u32 {
        self.context_saves
    }

    /// Forget the write history, keeping the contents.
    pub fn reset_counters(&mut self) {
        self.writes = [0; N];
        self.context_saves = 0;
    }

    fn range(&self, offset: u16, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let start = offset as usize;
        let end = start + len;
        if end > N {
            return Err(StorageError::OutOfRange {
                offset,
                len: len as u16,
            });
        }
        Ok(start..end)
    }
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NvStore for MemoryStore<N> {
    type Error = StorageError;

    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, data.len())?;
        for count in &mut self.writes[range.clone()] {
            *count += 1;
        }
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn erase_and_write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, data.len())?;
        self.bytes[range].fill(ERASED);
        self.write(offset, data)
    }

    fn with_preserved_context<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.context_saves += 1;
        f(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_counts() {
        let mut store = MemoryStore::<8>::new();
        store.write(2, &[1, 2]).unwrap();
        store.erase_and_write(3, &[9]).unwrap();

        assert_eq!(store.writes_at(2), 1);
        assert_eq!(store.writes_at(3), 2);
        assert_eq!(store.total_writes(), 3);
        assert_eq!(store.bytes()[..5], [ERASED, ERASED, 1, 9, ERASED]);
    }

    #[test]
    fn test_out_of_range() {
        let mut store = MemoryStore::<4>::new();
        assert_eq!(
            store.write(3, &[0, 0]),
            Err(StorageError::OutOfRange { offset: 3, len: 2 })
        );
    }
}
