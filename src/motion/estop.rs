//! Emergency stop flag.

use core::sync::atomic::{AtomicBool, Ordering};

/// Flag raised from any context to abort the running operation.
///
/// Long-running operations poll it between timer wakes and return
/// [`MotionError::EmergencyStop`](crate::error::MotionError::EmergencyStop)
/// once it is set. It stays raised until [`EmergencyStop::clear`].
#[derive(Debug, Default)]
pub struct EmergencyStop(AtomicBool);

impl EmergencyStop {
    /// Lowered flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag.
    #[inline]
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if the flag is raised.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lower the flag.
    #[inline]
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}
