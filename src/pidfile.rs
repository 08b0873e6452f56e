// src/pidfile.rs

//! Single-instance enforcement across processes.
//!
//! Execution locks and cooldowns live in process memory, so two covsched
//! processes working against the same store could overlap on one job's
//! artifact set. The daemon therefore holds an exclusive advisory lock on a
//! pidfile next to the job store for its whole lifetime, and one-shot manual
//! invocations take the same lock for the duration of their run.
//!
//! The lock, not the file's existence, is the signal: the operating system
//! releases it when the holder exits for any reason, so there is no stale
//! pidfile handling and the file is never deleted.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("another covsched process holds the run lock at {path}")]
    Held { path: PathBuf },

    #[error("run lock I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pidfile location for a given job store: a `.pid` sibling, so every store
/// carries its own run lock.
pub fn path_for_store(store_path: &Path) -> PathBuf {
    store_path.with_extension("pid")
}

/// An exclusively locked pidfile. Dropping it releases the lock.
pub struct PidFile {
    _file: File,
    path: PathBuf,
}

impl PidFile {
    /// Create (or reuse) the pidfile and take its exclusive lock without
    /// blocking. Fails with [`PidFileError::Held`] while any other process
    /// holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| PidFileError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| PidFileError::Io {
                path: path.clone(),
                source,
            })?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(PidFileError::Held { path }),
            Err(TryLockError::Error(source)) => return Err(PidFileError::Io { path, source }),
        }

        // The recorded pid is diagnostic only; correctness rests on the lock.
        file.set_len(0).map_err(|source| PidFileError::Io {
            path: path.clone(),
            source,
        })?;
        writeln!(file, "{}", process::id()).map_err(|source| PidFileError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "run lock acquired");
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_while_held_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covsched.pid");

        let held = PidFile::acquire(&path).unwrap();
        assert!(matches!(
            PidFile::acquire(&path),
            Err(PidFileError::Held { .. })
        ));

        drop(held);
        PidFile::acquire(&path).unwrap();
    }

    #[test]
    fn pidfile_sits_next_to_the_store() {
        assert_eq!(
            path_for_store(Path::new("/var/lib/covsched/jobs.toml")),
            PathBuf::from("/var/lib/covsched/jobs.pid")
        );
    }

    #[test]
    fn records_the_holder_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covsched.pid");

        let _held = PidFile::acquire(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), process::id().to_string());
    }
}
