//! Single-slot, mutex-guarded value holder.
//!
//! Writers swap the whole value in one assignment and readers clone it out,
//! so a reader sees either the value before a `replace_with` or the value
//! after it, never a mix. Critical sections never perform I/O.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Generic single-slot store.
///
/// Store an `Arc<T>` when `T` is expensive to clone; `get_latest` then only
/// bumps a reference count while holding the lock.
pub struct Container<T: Clone> {
    slot: Mutex<T>,
}

impl<T: Clone> Container<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(value),
        }
    }

    /// Atomically overwrite the stored value.
    pub fn replace_with(&self, value: T) {
        let previous = {
            let mut slot = self.lock();
            std::mem::replace(&mut *slot, value)
        };
        // Drop outside the lock; zeroizing an old key is not O(1).
        drop(previous);
    }

    /// Atomically return a copy of the stored value.
    pub fn get_latest(&self) -> T {
        self.lock().clone()
    }

    // A panic while holding the lock can only happen inside `clone`, after
    // the slot already holds a complete value, so poisoning is recoverable.
    fn lock(&self) -> MutexGuard<'_, T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container").finish_non_exhaustive()
    }
}
