// src/sched/scheduler.rs

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::daemon::RuntimeEvent;
use crate::sched::parse_schedule;
use crate::store::{Job, JobId};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("no scheduled entry for job '{0}'")]
    NotFound(JobId),
}

/// Outcome of a bulk reload: which jobs went live and which were skipped.
///
/// A skipped job stays in storage; it is only excluded from live scheduling.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub scheduled: Vec<JobId>,
    pub skipped: Vec<(JobId, ScheduleError)>,
}

/// Runtime pairing of a job identity with its active recurring trigger.
///
/// The timer task sleeps until the next cron occurrence and then sends a
/// `JobDue` event; it never executes pipeline work itself. Dropping the entry
/// aborts the task, so removal guarantees no further firings.
struct ScheduledEntry {
    cron: String,
    handle: JoinHandle<()>,
}

impl ScheduledEntry {
    fn spawn(id: JobId, cron: String, schedule: Schedule, events: mpsc::Sender<RuntimeEvent>) -> Self {
        let job = id.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    debug!(job = %job, "schedule has no upcoming occurrence; trigger task ending");
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                debug!(job = %job, fired_at = %next, "cron trigger fired");
                if events.send(RuntimeEvent::JobDue { job: job.clone() }).await.is_err() {
                    debug!(job = %job, "runtime channel closed; trigger task ending");
                    break;
                }
            }
        });

        Self { cron, handle }
    }
}

impl Drop for ScheduledEntry {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Owns the live mapping from job identity to recurring trigger.
///
/// `add` / `remove` / `replace` / `reload_all` are the only ways scheduled
/// work changes at runtime. Entries are never persisted; they are rebuilt
/// from [`Job`] records at startup and on every mutation.
pub struct Scheduler {
    entries: HashMap<JobId, ScheduledEntry>,
    events: mpsc::Sender<RuntimeEvent>,
}

impl Scheduler {
    pub fn new(events: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            entries: HashMap::new(),
            events,
        }
    }

    /// Register a recurring trigger for the job, replacing any prior entry
    /// under the same identity (idempotent upsert).
    pub fn add(&mut self, job: &Job) -> Result<(), ScheduleError> {
        let schedule = parse_schedule(&job.cron)?;
        let entry = ScheduledEntry::spawn(
            job.id.clone(),
            job.cron.clone(),
            schedule,
            self.events.clone(),
        );

        if self.entries.insert(job.id.clone(), entry).is_some() {
            debug!(job = %job.id, cron = %job.cron, "replaced existing scheduled entry");
        } else {
            info!(job = %job.id, cron = %job.cron, "scheduled job");
        }
        Ok(())
    }

    /// Deregister the entry for a job. The aborted timer task can never fire
    /// again after this returns.
    pub fn remove(&mut self, id: &JobId) -> Result<(), ScheduleError> {
        match self.entries.remove(id) {
            Some(_) => {
                info!(job = %id, "unscheduled job");
                Ok(())
            }
            None => Err(ScheduleError::NotFound(id.clone())),
        }
    }

    /// Swap in a new schedule for a job: remove the old entry (absent is
    /// fine), then add the new one.
    pub fn replace(&mut self, job: &Job) -> Result<(), ScheduleError> {
        if let Err(ScheduleError::NotFound(_)) = self.remove(&job.id) {
            debug!(job = %job.id, "no prior entry to replace");
        }
        self.add(job)
    }

    /// Drop all live entries and schedule the given jobs from scratch.
    ///
    /// A job with an unparseable cron expression is skipped and recorded in
    /// the report; it never aborts scheduling of the remaining jobs.
    pub fn reload_all(&mut self, jobs: &[Job]) -> ReloadReport {
        self.entries.clear();

        let mut report = ReloadReport::default();
        for job in jobs {
            match self.add(job) {
                Ok(()) => report.scheduled.push(job.id.clone()),
                Err(err) => {
                    warn!(job = %job.id, cron = %job.cron, error = %err, "job misconfigured; skipped from live scheduling");
                    report.skipped.push((job.id.clone(), err));
                }
            }
        }

        info!(
            scheduled = report.scheduled.len(),
            skipped = report.skipped.len(),
            "scheduler reload complete"
        );
        report
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.entries.contains_key(id)
    }

    /// Cron expression of the live entry for a job, if any.
    pub fn cron_for(&self, id: &JobId) -> Option<&str> {
        self.entries.get(id).map(|e| e.cron.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn job_ids(&self) -> impl Iterator<Item = &JobId> {
        self.entries.keys()
    }
}
