// src/report/pipeline.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::report::{run_tool, PipelineError};
use crate::store::JobId;

/// The fixed artifact set one job's reports are written to.
///
/// Every job gets its own directory under the output root, so two different
/// jobs can never corrupt each other's artifacts; self-overlap within one job
/// is prevented by the execution guard.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub dir: PathBuf,
    pub exec_file: PathBuf,
    pub xml_file: PathBuf,
    pub csv_file: PathBuf,
    pub html_dir: PathBuf,
}

impl ReportPaths {
    pub fn for_job(output_root: &Path, id: &JobId) -> Self {
        let dir = output_root.join(id.as_str());
        Self {
            exec_file: dir.join("testcase.exec"),
            xml_file: dir.join("jacoco.xml"),
            csv_file: dir.join("jacoco.csv"),
            html_dir: dir.join("html"),
            dir,
        }
    }
}

/// The two multi-step external-tool sequences that produce report artifacts.
///
/// Both talk to the same running instrumentation agent (fixed host/port) via
/// the coverage CLI's `dump` command and then render HTML/XML/CSV reports
/// from the dumped exec data via its `report` command.
pub struct ReportPipeline {
    java: String,
    cli_jar: PathBuf,
    agent_host: String,
    agent_port: u16,
    classfiles: PathBuf,
    sourcefiles: PathBuf,
    output_root: PathBuf,
    settle_poll: Duration,
    settle_timeout: Duration,
    fallback_delay: Duration,
}

impl ReportPipeline {
    pub fn new(settings: &Settings) -> Self {
        Self {
            java: settings.java.clone(),
            cli_jar: settings.cli_jar(),
            agent_host: settings.agent_host.clone(),
            agent_port: settings.agent_port,
            classfiles: settings.classfiles.clone(),
            sourcefiles: settings.sourcefiles.clone(),
            output_root: settings.output_dir.clone(),
            settle_poll: settings.dump_settle_poll,
            settle_timeout: settings.dump_settle_timeout,
            fallback_delay: settings.dump_fallback_delay,
        }
    }

    pub fn paths_for(&self, id: &JobId) -> ReportPaths {
        ReportPaths::for_job(&self.output_root, id)
    }

    /// Refresh the job's report from the agent's current coverage state:
    /// dump exec data, wait for the agent to finish flushing it, then render
    /// the reports. The report step never runs if the dump failed.
    pub async fn update_report(&self, id: &JobId) -> Result<(), PipelineError> {
        let paths = self.paths_for(id);
        fs::create_dir_all(&paths.dir).await?;

        self.dump(&paths, false).await?;
        self.wait_for_exec_data(&paths.exec_file).await;
        self.generate(&paths).await
    }

    /// Drop the job's existing artifacts, reset the agent's accumulated
    /// coverage state, and render a fresh baseline report.
    ///
    /// The deletion step is idempotent: artifacts that are already gone are
    /// not an error, so running this twice in a row is safe.
    pub async fn clear_and_regenerate(&self, id: &JobId) -> Result<(), PipelineError> {
        let paths = self.paths_for(id);
        fs::create_dir_all(&paths.dir).await?;

        remove_if_present(&paths.exec_file).await?;
        remove_if_present(&paths.xml_file).await?;
        remove_if_present(&paths.csv_file).await?;

        self.dump(&paths, true).await?;
        self.generate(&paths).await
    }

    async fn dump(&self, paths: &ReportPaths, reset: bool) -> Result<(), PipelineError> {
        let mut args = vec![
            "-jar".to_string(),
            self.cli_jar.to_string_lossy().into_owned(),
            "dump".to_string(),
            "--address".to_string(),
            self.agent_host.clone(),
            "--port".to_string(),
            self.agent_port.to_string(),
        ];
        if reset {
            args.push("--reset".to_string());
        }
        args.push("--destfile".to_string());
        args.push(paths.exec_file.to_string_lossy().into_owned());

        run_tool("dump", &self.java, &args).await
    }

    async fn generate(&self, paths: &ReportPaths) -> Result<(), PipelineError> {
        let args = vec![
            "-jar".to_string(),
            self.cli_jar.to_string_lossy().into_owned(),
            "report".to_string(),
            paths.exec_file.to_string_lossy().into_owned(),
            "--html".to_string(),
            paths.html_dir.to_string_lossy().into_owned(),
            "--xml".to_string(),
            paths.xml_file.to_string_lossy().into_owned(),
            "--csv".to_string(),
            paths.csv_file.to_string_lossy().into_owned(),
            "--classfiles".to_string(),
            self.classfiles.to_string_lossy().into_owned(),
            "--sourcefiles".to_string(),
            self.sourcefiles.to_string_lossy().into_owned(),
        ];

        run_tool("report", &self.java, &args).await
    }

    /// Wait until the agent has finished flushing the dumped exec data.
    ///
    /// The dump command can return before the file contents are complete, so
    /// the exec file is polled until its size is non-zero and stable across
    /// two consecutive observations. If it never stabilises within the
    /// timeout, a bounded fixed delay is applied instead.
    async fn wait_for_exec_data(&self, exec_file: &Path) {
        let deadline = Instant::now() + self.settle_timeout;
        let mut last_len: Option<u64> = None;

        while Instant::now() < deadline {
            match fs::metadata(exec_file).await {
                Ok(meta) => {
                    let len = meta.len();
                    if len > 0 && last_len == Some(len) {
                        debug!(file = %exec_file.display(), len, "exec data stable");
                        return;
                    }
                    last_len = Some(len);
                }
                Err(_) => {
                    last_len = None;
                }
            }
            tokio::time::sleep(self.settle_poll).await;
        }

        warn!(
            file = %exec_file.display(),
            timeout = ?self.settle_timeout,
            "exec data did not stabilise in time; applying fixed fallback delay"
        );
        tokio::time::sleep(self.fallback_delay).await;
    }
}

/// Delete a file, treating "already gone" as success.
async fn remove_if_present(path: &Path) -> Result<(), PipelineError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(file = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
