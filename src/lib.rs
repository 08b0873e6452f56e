// src/lib.rs

pub mod cli;
pub mod config;
pub mod cooldown;
pub mod daemon;
pub mod guard;
pub mod logging;
pub mod pidfile;
pub mod report;
pub mod sched;
pub mod service;
pub mod store;
pub mod watch;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::Settings;
use crate::daemon::{Daemon, RuntimeEvent};
use crate::pidfile::PidFile;
use crate::service::{JobService, TriggerOutcome};
use crate::store::{FileStore, JobId, JobStore};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = config::load_and_resolve(&args.config)?;

    match args.command {
        Command::Run => run_daemon(settings).await,
        Command::List => list_jobs(&settings),
        Command::Add { name, cron } => add_job(&settings, &name, &cron),
        Command::Edit { id, name, cron } => edit_job(&settings, &id, name, cron),
        Command::Remove { id } => remove_job(&settings, &id),
        Command::Trigger { id } => manual(settings, &id, ManualAction::Update).await,
        Command::Clear { id } => manual(settings, &id, ManualAction::Clear).await,
    }
}

/// Wire up and run the daemon: initial load from the store, the store-file
/// watcher, Ctrl-C handling, and the event loop.
///
/// The store's run lock is held for the daemon's whole lifetime, so manual
/// one-shots (whose guard and cooldown state this process does not share)
/// refuse to run alongside it.
async fn run_daemon(settings: Settings) -> Result<()> {
    let _run_lock = PidFile::acquire(pidfile::path_for_store(&settings.store_path))
        .context("another covsched instance is already running against this store")?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let store = Box::new(FileStore::new(&settings.store_path));
    let service = Arc::new(JobService::new(&settings, store, rt_tx.clone()));

    let report = service.reload().await?;
    info!(
        scheduled = report.scheduled.len(),
        skipped = report.skipped.len(),
        "initial job load complete"
    );

    let _watcher = watch::spawn_store_watcher(&settings.store_path, rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    Daemon::new(service, rt_rx).run().await
}

fn list_jobs(settings: &Settings) -> Result<()> {
    let store = FileStore::new(&settings.store_path);
    let jobs = store.list()?;

    if jobs.is_empty() {
        println!("no jobs stored in {}", settings.store_path.display());
        return Ok(());
    }

    for job in jobs {
        let status = match sched::parse_schedule(&job.cron) {
            Ok(_) => "ok",
            Err(_) => "invalid cron",
        };
        println!("{}  {}  [{}]  ({})", job.id, job.name, job.cron, status);
    }
    Ok(())
}

/// One-shot store mutations. A running daemon picks these up through its
/// store-file watcher.
fn add_job(settings: &Settings, name: &str, cron: &str) -> Result<()> {
    sched::parse_schedule(cron)?;
    let store = FileStore::new(&settings.store_path);
    let job = store.create(name, cron)?;
    println!("added job {} ({})", job.id, job.name);
    Ok(())
}

fn edit_job(
    settings: &Settings,
    id: &str,
    name: Option<String>,
    cron: Option<String>,
) -> Result<()> {
    if name.is_none() && cron.is_none() {
        return Err(anyhow!("nothing to edit: pass --name and/or --cron"));
    }
    if let Some(cron) = cron.as_deref() {
        sched::parse_schedule(cron)?;
    }

    let store = FileStore::new(&settings.store_path);
    let job = store.update(&JobId::from(id), name.as_deref(), cron.as_deref())?;
    println!("edited job {}: {} [{}]", job.id, job.name, job.cron);
    Ok(())
}

fn remove_job(settings: &Settings, id: &str) -> Result<()> {
    let store = FileStore::new(&settings.store_path);
    store.delete(&JobId::from(id))?;
    println!("removed job {id}");
    Ok(())
}

enum ManualAction {
    Update,
    Clear,
}

/// One-shot manual pipeline run.
///
/// This builds its own service, so its execution lock and cooldown state are
/// local to this process. Overlap with a running daemon (or another one-shot)
/// is prevented by the store's run lock, held for the duration of the run.
async fn manual(settings: Settings, id: &str, action: ManualAction) -> Result<()> {
    let _run_lock = PidFile::acquire(pidfile::path_for_store(&settings.store_path))
        .context("manual triggers cannot run alongside another covsched process")?;

    // The scheduler inside the service stays empty here, so its event
    // channel is never used.
    let (rt_tx, _rt_rx) = mpsc::channel::<RuntimeEvent>(1);
    let store = Box::new(FileStore::new(&settings.store_path));
    let service = JobService::new(&settings, store, rt_tx);

    let id = JobId::from(id);
    let outcome = match action {
        ManualAction::Update => service.trigger_update(&id).await?,
        ManualAction::Clear => service.trigger_clear(&id).await?,
    };

    match outcome {
        TriggerOutcome::Ran => {
            let paths = service.report_paths(&id);
            println!("report refreshed: {}", paths.dir.display());
            Ok(())
        }
        TriggerOutcome::Busy => {
            warn!(job = %id, "job is already running");
            Err(anyhow!("job {id} is already running; request dropped"))
        }
        TriggerOutcome::TooSoon => {
            Err(anyhow!("job {id} was triggered too recently; retry later"))
        }
    }
}
