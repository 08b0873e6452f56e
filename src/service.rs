// src/service.rs

//! Administrative and trigger surface over the whole subsystem.
//!
//! [`JobService`] owns the store, the live scheduler, the execution guard,
//! the rate limiter, and the report pipeline, and sequences every operation
//! that touches more than one of them:
//!
//! - mutations persist to the store first, then update the live scheduler,
//!   so a committed schedule value is never shadowed by a stale trigger; a
//!   crash in between is repaired by the next full reload
//! - manual triggers check the cooldown before the lock, so "too soon" is
//!   reported even when nothing is running
//! - the scheduled path logs failures and never propagates them

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::cooldown::{ActionKind, RateLimiter};
use crate::daemon::RuntimeEvent;
use crate::guard::ExecutionGuard;
use crate::report::{PipelineError, ReportPipeline};
use crate::sched::{parse_schedule, ReloadReport, ScheduleError, Scheduler};
use crate::store::{Job, JobId, JobStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result of a manual trigger attempt.
///
/// `Busy` and `TooSoon` are normal contention outcomes, not errors; pipeline
/// failures surface as [`ServiceError::Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Ran,
    /// The job is already running; the request was dropped.
    Busy,
    /// Inside the cooldown window; retry later.
    TooSoon,
}

pub struct JobService {
    store: Box<dyn JobStore>,
    scheduler: Mutex<Scheduler>,
    guard: ExecutionGuard,
    limiter: RateLimiter,
    pipeline: ReportPipeline,
    update_cooldown: Duration,
    clear_cooldown: Duration,
}

impl JobService {
    pub fn new(
        settings: &Settings,
        store: Box<dyn JobStore>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            store,
            scheduler: Mutex::new(Scheduler::new(events)),
            guard: ExecutionGuard::new(),
            limiter: RateLimiter::new(),
            pipeline: ReportPipeline::new(settings),
            update_cooldown: settings.update_cooldown,
            clear_cooldown: settings.clear_cooldown,
        }
    }

    /// Rebuild the live schedule from the store. Called at startup and
    /// whenever the store file changes on disk; also the recovery path when
    /// store and scheduler have diverged.
    pub async fn reload(&self) -> Result<ReloadReport, ServiceError> {
        let jobs = self.store.list()?;
        let mut scheduler = self.scheduler.lock().await;
        Ok(scheduler.reload_all(&jobs))
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, ServiceError> {
        Ok(self.store.list()?)
    }

    /// Create a job and put it live. The cron expression is validated before
    /// anything is persisted, so an administrative add with a bad expression
    /// is rejected outright instead of landing in storage as misconfigured.
    pub async fn add_job(&self, name: &str, cron: &str) -> Result<Job, ServiceError> {
        parse_schedule(cron)?;
        let job = self.store.create(name, cron)?;
        self.scheduler.lock().await.add(&job)?;
        info!(job = %job.id, name = %job.name, cron = %job.cron, "job added");
        Ok(job)
    }

    /// Edit name and/or cron. Storage is committed first, then the live
    /// entry is swapped, so the old trigger cannot fire after the new
    /// schedule value is durable.
    pub async fn edit_job(
        &self,
        id: &JobId,
        name: Option<&str>,
        cron: Option<&str>,
    ) -> Result<Job, ServiceError> {
        if let Some(cron) = cron {
            parse_schedule(cron)?;
        }
        let job = self.store.update(id, name, cron)?;
        self.scheduler.lock().await.replace(&job)?;
        info!(job = %job.id, "job edited");
        Ok(job)
    }

    /// Delete a job from storage and deregister its live trigger. A job that
    /// was never live (misconfigured cron) has no entry to remove; that is
    /// not an error here.
    pub async fn delete_job(&self, id: &JobId) -> Result<(), ServiceError> {
        self.store.delete(id)?;
        if let Err(ScheduleError::NotFound(_)) = self.scheduler.lock().await.remove(id) {
            debug!(job = %id, "deleted job had no live entry");
        }
        info!(job = %id, "job deleted");
        Ok(())
    }

    /// Manual report refresh. Cooldown (routine class, default 10 s) is
    /// checked before the lock; pipeline failures propagate to the caller.
    pub async fn trigger_update(&self, id: &JobId) -> Result<TriggerOutcome, ServiceError> {
        let job = self.store.get(id)?;

        if !self
            .limiter
            .allow(id, ActionKind::Update, self.update_cooldown)
            .await
        {
            return Ok(TriggerOutcome::TooSoon);
        }

        match self.guard.try_run(id.as_str(), self.pipeline.update_report(id)).await {
            None => Ok(TriggerOutcome::Busy),
            Some(result) => {
                result?;
                info!(job = %job.id, "manual report refresh completed");
                Ok(TriggerOutcome::Ran)
            }
        }
    }

    /// Manual clear-and-regenerate. Destructive, so it carries the longer
    /// cooldown class (default 30 s). The pipeline runs twice back to back:
    /// the first pass resets the agent, the second rebuilds the report from
    /// the freshly reset state.
    pub async fn trigger_clear(&self, id: &JobId) -> Result<TriggerOutcome, ServiceError> {
        let job = self.store.get(id)?;

        if !self
            .limiter
            .allow(id, ActionKind::ClearRegenerate, self.clear_cooldown)
            .await
        {
            return Ok(TriggerOutcome::TooSoon);
        }

        let action = async {
            self.pipeline.clear_and_regenerate(id).await?;
            self.pipeline.clear_and_regenerate(id).await
        };

        match self.guard.try_run(id.as_str(), action).await {
            None => Ok(TriggerOutcome::Busy),
            Some(result) => {
                result?;
                info!(job = %job.id, "manual clear-and-regenerate completed");
                Ok(TriggerOutcome::Ran)
            }
        }
    }

    /// The scheduled path: refresh the report if the job is not already
    /// running. Contention means "skip this firing"; failures are logged and
    /// swallowed so a pipeline fault can never take down the daemon loop.
    pub async fn run_scheduled(&self, id: &JobId) {
        match self.guard.try_run(id.as_str(), self.pipeline.update_report(id)).await {
            None => {
                debug!(job = %id, "previous run still in progress; skipping this firing");
            }
            Some(Ok(())) => {
                info!(job = %id, "scheduled report refresh completed");
            }
            Some(Err(err)) => {
                error!(job = %id, error = %err, "scheduled report refresh failed");
            }
        }
    }

    /// Identities with a live trigger. Mostly useful for inspection and
    /// tests.
    pub async fn scheduled_ids(&self) -> Vec<JobId> {
        let scheduler = self.scheduler.lock().await;
        scheduler.job_ids().cloned().collect()
    }

    /// Cron expression of the live entry for a job, if it has one.
    pub async fn scheduled_cron(&self, id: &JobId) -> Option<String> {
        let scheduler = self.scheduler.lock().await;
        scheduler.cron_for(id).map(|s| s.to_string())
    }

    pub fn report_paths(&self, id: &JobId) -> crate::report::ReportPaths {
        self.pipeline.paths_for(id)
    }
}
