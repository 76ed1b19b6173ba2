//! Per-session mutual exclusion for the submit-to-advance pipeline.
//!
//! Acquisition never waits: a held lock means another submission for that
//! session is in flight, and the caller rejects rather than queues. Entries
//! are pruned when the last guard for a session is released.

use std::sync::Arc;

use dashmap::DashMap;
use powertale_domain::SessionId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<SessionId, Arc<Mutex<()>>>;

/// Guard proving exclusive access to one session until dropped.
pub struct SessionGuard {
    session_id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Release first so the owned guard's Arc no longer counts.
        self.guard.take();
        self.locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<LockTable>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the session's lock, or `None` if it is already held.
    pub fn try_acquire(&self, session_id: SessionId) -> Option<SessionGuard> {
        let lock = self
            .locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.try_lock_owned().ok().map(|guard| SessionGuard {
            session_id,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        })
    }
}
