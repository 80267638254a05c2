//! Per-key mutual exclusion.

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Serializes work per key while letting different keys proceed in parallel.
///
/// The store lookup and the remote call for one local ID are not atomic
/// together, so two reconciliations of the same entity must never overlap.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock for `key` is held.
    pub(crate) fn lock(&self, key: &str) -> ArcMutexGuard<RawMutex, ()> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        slot.lock_arc()
    }

    /// Drops the slot for `key` if nobody holds or waits on it.
    pub(crate) fn release(&self, key: &str) {
        let mut slots = self.slots.lock();
        if slots.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
