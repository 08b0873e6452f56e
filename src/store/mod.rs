// src/store/mod.rs

//! Durable job definitions.
//!
//! The scheduler core only ever talks to the [`JobStore`] trait; the concrete
//! TOML-file-backed implementation lives in [`file`]. The store owns job
//! persistence and nothing else: live triggers are reconstructed from stored
//! jobs by the scheduler at startup and on every mutation.

pub mod file;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileStore;

/// Opaque, stable job identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A stored job definition: display name plus cron expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub cron: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no job with id '{0}'")]
    NotFound(JobId),

    #[error("job store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing job store: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serializing job store: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Registry of job definitions.
///
/// Implementations persist jobs somewhere durable; callers must not assume
/// anything about the storage format.
pub trait JobStore: Send + Sync {
    fn list(&self) -> Result<Vec<Job>, StoreError>;
    fn get(&self, id: &JobId) -> Result<Job, StoreError>;
    fn create(&self, name: &str, cron: &str) -> Result<Job, StoreError>;
    fn update(
        &self,
        id: &JobId,
        name: Option<&str>,
        cron: Option<&str>,
    ) -> Result<Job, StoreError>;
    fn delete(&self, id: &JobId) -> Result<(), StoreError>;
}
