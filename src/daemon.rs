// src/daemon.rs

//! The daemon event loop.
//!
//! All trigger sources converge on one mpsc channel:
//! - cron timer tasks send `JobDue`
//! - the store-file watcher sends `StoreChanged`
//! - Ctrl-C handling sends `ShutdownRequested`
//!
//! Each `JobDue` is dispatched onto its own tokio task, so a slow or hung
//! pipeline can never block the loop or the cron timers, and a pipeline
//! failure is isolated per firing (logged inside the scheduled path, never
//! propagated here).

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::service::JobService;
use crate::store::JobId;

/// Events sent into the daemon from timers, the store watcher, or signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A job's cron trigger fired.
    JobDue { job: JobId },
    /// The job store file changed on disk; reload the live schedule.
    StoreChanged,
    ShutdownRequested,
}

pub struct Daemon {
    service: Arc<JobService>,
    events_rx: mpsc::Receiver<RuntimeEvent>,
}

impl Daemon {
    pub fn new(service: Arc<JobService>, events_rx: mpsc::Receiver<RuntimeEvent>) -> Self {
        Self { service, events_rx }
    }

    /// Main event loop. Returns when a shutdown is requested or every event
    /// sender has gone away.
    pub async fn run(mut self) -> Result<()> {
        info!("covsched daemon started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "daemon received event");

            match event {
                RuntimeEvent::JobDue { job } => {
                    let service = Arc::clone(&self.service);
                    tokio::spawn(async move {
                        service.run_scheduled(&job).await;
                    });
                }
                RuntimeEvent::StoreChanged => match self.service.reload().await {
                    Ok(report) => info!(
                        scheduled = report.scheduled.len(),
                        skipped = report.skipped.len(),
                        "job store changed; live schedule reloaded"
                    ),
                    Err(err) => {
                        error!(error = %err, "reload after store change failed");
                    }
                },
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping daemon");
                    break;
                }
            }
        }

        info!("covsched daemon exiting");
        Ok(())
    }
}
