// src/store/file.rs

//! TOML-file-backed [`JobStore`].
//!
//! The file holds one `[job.<id>]` table per job:
//!
//! ```toml
//! [job.1]
//! name = "nightly smoke suite"
//! cron = "0 2 * * *"
//! ```
//!
//! Every operation reads the whole file and writes it back, which is fine for
//! the bounded, administratively-managed job sets this tool deals with. A
//! missing file is treated as an empty store so the first `create` bootstraps
//! it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Job, JobId, JobStore, StoreError};

/// On-disk shape of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    job: BTreeMap<String, JobRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobRecord {
    name: String,
    cron: String,
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFile::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(toml::from_str(&contents)?)
    }

    fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        let contents = toml::to_string_pretty(file)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Next free numeric id. Non-numeric ids are tolerated and ignored.
    fn next_id(file: &StoreFile) -> String {
        let max = file
            .job
            .keys()
            .filter_map(|k| k.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

impl JobStore for FileStore {
    fn list(&self) -> Result<Vec<Job>, StoreError> {
        let file = self.load()?;
        Ok(file
            .job
            .into_iter()
            .map(|(id, rec)| Job {
                id: JobId::new(id),
                name: rec.name,
                cron: rec.cron,
            })
            .collect())
    }

    fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        let file = self.load()?;
        let rec = file
            .job
            .get(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(Job {
            id: id.clone(),
            name: rec.name.clone(),
            cron: rec.cron.clone(),
        })
    }

    fn create(&self, name: &str, cron: &str) -> Result<Job, StoreError> {
        let mut file = self.load()?;
        let id = Self::next_id(&file);
        file.job.insert(
            id.clone(),
            JobRecord {
                name: name.to_string(),
                cron: cron.to_string(),
            },
        );
        self.save(&file)?;
        debug!(job = %id, "created job in store");
        Ok(Job {
            id: JobId::new(id),
            name: name.to_string(),
            cron: cron.to_string(),
        })
    }

    fn update(
        &self,
        id: &JobId,
        name: Option<&str>,
        cron: Option<&str>,
    ) -> Result<Job, StoreError> {
        let mut file = self.load()?;
        let rec = file
            .job
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if let Some(name) = name {
            rec.name = name.to_string();
        }
        if let Some(cron) = cron {
            rec.cron = cron.to_string();
        }

        let job = Job {
            id: id.clone(),
            name: rec.name.clone(),
            cron: rec.cron.clone(),
        };
        self.save(&file)?;
        debug!(job = %id, "updated job in store");
        Ok(job)
    }

    fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        let mut file = self.load()?;
        if file.job.remove(id.as_str()).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.save(&file)?;
        debug!(job = %id, "deleted job from store");
        Ok(())
    }
}
