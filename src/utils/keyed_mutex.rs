use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutex keyed by staging file name.
///
/// Holders of different names never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct KeyedMutex {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock on `key`; released when the guard is dropped.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        mutex.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
