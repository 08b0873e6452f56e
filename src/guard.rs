// src/guard.rs

//! Per-key non-blocking mutual exclusion for pipeline runs.
//!
//! Both the scheduled path and manual triggers funnel through one
//! [`ExecutionGuard`] keyed by job identity. Report artifacts are scoped per
//! job, so the job identity is also the output-resource identity: holding a
//! job's lock means exclusive access to that job's artifact set, whichever
//! action kind is running.
//!
//! Acquisition is always try-style. Contention resolves to "skip this
//! invocation"; nothing ever queues or waits, so a slow external tool cannot
//! build up a backlog.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

/// Owns the lock registry. Locks are created lazily on first reference and
/// live for the process lifetime; the key space is bounded by administrative
/// action, so entries are never reclaimed.
#[derive(Default)]
pub struct ExecutionGuard {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExecutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` if the lock for `key` is free.
    ///
    /// Returns `None` immediately, without polling `action`, when the lock is
    /// already held. On success the lock is held for the whole execution of
    /// `action` and released on every exit path: the guard is an RAII value
    /// dropped when the future completes or is torn down.
    pub async fn try_run<T, F>(&self, key: &str, action: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let slot = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        let Ok(_held) = slot.try_lock_owned() else {
            debug!(key, "execution lock busy; dropping invocation");
            return None;
        };

        Some(action.await)
    }

    /// Whether the lock for `key` is currently held. Intended for
    /// observability; the answer may be stale by the time it is read.
    pub async fn is_held(&self, key: &str) -> bool {
        let locks = self.locks.lock().await;
        match locks.get(key) {
            Some(slot) => slot.try_lock().is_err(),
            None => false,
        }
    }
}
