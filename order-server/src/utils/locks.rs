//! Per-key async locks
//!
//! Cart and wallet mutations are read-modify-write: two concurrent requests
//! for the same user would otherwise lose updates. A [`KeyedMutex`] hands out
//! one async mutex per key (user id) so mutations for a single user
//! serialize while different users proceed independently.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Map of named async mutexes, created lazily per key.
///
/// Entries are never evicted; the population is bounded by the number of
/// distinct users seen since startup.
#[derive(Debug, Default)]
pub struct KeyedMutex {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Get (or create) the mutex for a key.
    ///
    /// The caller holds the returned guard for the duration of its
    /// read-modify-write sequence:
    ///
    /// ```ignore
    /// let lock = state.user_locks.get("usr_42");
    /// let _guard = lock.lock().await;
    /// // load, mutate, save
    /// ```
    pub fn get(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
