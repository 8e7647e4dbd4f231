//! Per-package read/write gate.
//!
//! Imports and removals of a package take the write side; asset reads take
//! the read side. Different packages never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// A map of read/write locks keyed by package identifier.
///
/// Idle entries are pruned whenever a new lock is handed out, so the map
/// only grows with the number of packages in use at once.
#[derive(Debug, Default)]
pub struct KeyedGate {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl KeyedGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Shared access to `key`; waits for any writer to finish.
    pub async fn read(&self, key: &str) -> OwnedRwLockReadGuard<()> {
        self.lock_for(key).read_owned().await
    }

    /// Exclusive access to `key`.
    pub async fn write(&self, key: &str) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(key).write_owned().await
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
