// src/report/mod.rs

//! Report generation pipelines.
//!
//! This module owns the two external-tool invocation sequences that produce
//! or refresh coverage report artifacts, using `tokio::process::Command`:
//!
//! - [`command`] launches a single CLI invocation and maps its exit status.
//! - [`pipeline`] sequences the dump / settle / report steps and the
//!   idempotent artifact cleanup, with all output paths scoped per job.

pub mod command;
pub mod pipeline;

use thiserror::Error;

pub use command::run_tool;
pub use pipeline::{ReportPaths, ReportPipeline};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The external command could not be launched at all.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command ran and exited non-zero.
    #[error("`{command}` exited with code {exit_code}")]
    ToolExit { command: String, exit_code: i32 },

    /// Filesystem work on report artifacts failed.
    #[error("report artifact I/O: {0}")]
    Io(#[from] std::io::Error),
}
