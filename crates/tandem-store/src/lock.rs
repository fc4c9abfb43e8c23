//! Per-session mutual exclusion.
//!
//! Every turn against a session runs load → advance → save while holding
//! that session's lock. Distinct sessions never contend. A lock entry lives
//! only while some turn holds or waits on it: the last [`SessionGuard`] to
//! drop removes it from the map.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Keyed async locks, one per session token.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<LockMap>,
}

/// Exclusive access to one session, released on drop.
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    map: Arc<LockMap>,
    token: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Unlock first so our own Arc no longer counts.
        drop(self.guard.take());
        // The map holds one reference; any more belong to waiters.
        self.map
            .remove_if(&self.token, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `token`.
    ///
    /// The guard releases the lock when dropped.
    pub async fn acquire(&self, token: &str) -> SessionGuard {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = Arc::clone(self.inner.entry(token.to_owned()).or_default().value());
        let guard = lock.lock_owned().await;
        SessionGuard {
            guard: Some(guard),
            map: Arc::clone(&self.inner),
            token: token.to_owned(),
        }
    }

    /// Drop lock entries nobody is holding or waiting on.
    ///
    /// Guards remove their own entry, so this normally finds nothing.
    pub fn prune_idle(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.inner.len()
    }

    /// Number of tracked lock entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
