//! Synchronization guard selected at construction

use keyseq_core::SyncMode;
use parking_lot::{Mutex, MutexGuard};

/// Wraps collection state behind the access policy chosen by [`SyncMode`].
///
/// Both modes keep the state in a `parking_lot::Mutex` so the collection is
/// `Sync` either way. Synchronized mode blocks on contention. Unsynchronized
/// mode never waits: overlapping access (another thread, or a callback
/// re-entering the collection) panics instead of corrupting state.
pub(crate) struct Guard<T> {
    mode: SyncMode,
    cell: Mutex<T>,
}

impl<T> Guard<T> {
    pub(crate) fn new(mode: SyncMode, value: T) -> Self {
        Guard {
            mode,
            cell: Mutex::new(value),
        }
    }

    #[inline]
    pub(crate) fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Acquire access for the duration of one operation
    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        match self.mode {
            SyncMode::Synchronized => self.cell.lock(),
            SyncMode::Unsynchronized => match self.cell.try_lock() {
                Some(guard) => guard,
                None => panic!(
                    "unsynchronized collection accessed concurrently or re-entrantly; \
                     build it with SyncMode::Synchronized to share it"
                ),
            },
        }
    }

    pub(crate) fn into_inner(self) -> T {
        self.cell.into_inner()
    }
}
