// src/watch.rs

//! Job store file watching.
//!
//! The daemon keeps its live schedule in sync with the store file: any change
//! to the file (an external edit, or a one-shot `covsched add`/`edit`/
//! `remove` run while the daemon is up) turns into a `StoreChanged` event and
//! a full scheduler reload. Reloads are idempotent, so no debouncing is done
//! for the bursts of events some platforms emit.

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::daemon::RuntimeEvent;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops store watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher on the store file's parent directory and send
/// `RuntimeEvent::StoreChanged` whenever the store file itself is touched.
///
/// The parent directory is watched rather than the file, because editors and
/// the file store itself replace the file wholesale, which would otherwise
/// drop the watch.
pub fn spawn_store_watcher(
    store_path: impl Into<PathBuf>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let store_path: PathBuf = store_path.into();
    let watch_dir = parent_dir(&store_path);
    let file_name = store_path.file_name().map(|n| n.to_os_string());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // Tracing isn't usable from notify's thread teardown path.
                    eprintln!("covsched: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("covsched: store watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
    info!(dir = %watch_dir.display(), store = %store_path.display(), "store watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let touches_store = match &file_name {
                Some(name) => event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(name.as_os_str())),
                None => false,
            };

            if !touches_store {
                continue;
            }

            debug!(?event, "store file changed");
            if let Err(err) = runtime_tx.send(RuntimeEvent::StoreChanged).await {
                warn!("failed to send RuntimeEvent::StoreChanged: {err}");
                // Runtime channel closed; nothing left to watch for.
                return;
            }
        }

        debug!("store watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
