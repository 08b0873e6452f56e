// src/cooldown.rs

//! Cooldown tracking for manual triggers.
//!
//! Manual re-triggers that arrive too soon after a previous one are rejected
//! before any lock or pipeline work happens. Each (job, action kind) pair has
//! its own record; the two action kinds carry different configured
//! thresholds (routine update vs. destructive clear-and-regenerate).

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::store::JobId;

/// The two manual pipeline actions, rate-limited independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Update,
    ClearRegenerate,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Update => f.write_str("update"),
            ActionKind::ClearRegenerate => f.write_str("clear-regenerate"),
        }
    }
}

/// Last-invocation timestamps per (job, action kind).
///
/// A read-then-write race between two callers is resolved last-writer-wins;
/// the execution guard rejects overlapping actual work regardless.
#[derive(Default)]
pub struct RateLimiter {
    last: Mutex<HashMap<(JobId, ActionKind), Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records the invocation when at least `cooldown` has
    /// elapsed since the last allowed invocation for this key (or the key has
    /// never been seen). Returns `false` otherwise, leaving the record
    /// untouched.
    pub async fn allow(&self, id: &JobId, kind: ActionKind, cooldown: Duration) -> bool {
        let mut last = self.last.lock().await;
        let now = Instant::now();

        if let Some(prev) = last.get(&(id.clone(), kind)) {
            let elapsed = now.duration_since(*prev);
            if elapsed < cooldown {
                debug!(job = %id, action = %kind, ?elapsed, "manual trigger inside cooldown window; rejected");
                return false;
            }
        }

        last.insert((id.clone(), kind), now);
        true
    }
}
