// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `COVSCHED_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => lvl.into(),
        None => std::env::var("COVSCHED_LOG")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(tracing::Level::INFO),
    };

    fmt().with_max_level(level).with_target(true).init();

    Ok(())
}
