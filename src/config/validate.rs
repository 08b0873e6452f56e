// src/config/validate.rs

use anyhow::{anyhow, Result};

use crate::config::model::Settings;

/// Run basic semantic validation against resolved settings.
///
/// This checks:
/// - the java launcher and agent host are non-empty
/// - the dump settle poll interval is non-zero and not longer than the
///   settle timeout
///
/// It does **not** check that the configured paths exist: the daemon may be
/// started before the instrumented target is built, and the external tool
/// reports missing inputs on its own.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.java.trim().is_empty() {
        return Err(anyhow!("[tool].java must not be empty"));
    }

    if settings.agent_host.trim().is_empty() {
        return Err(anyhow!("[agent].host must not be empty"));
    }

    if settings.dump_settle_poll.is_zero() {
        return Err(anyhow!("[dump].settle_poll_ms must be >= 1"));
    }

    if settings.dump_settle_poll > settings.dump_settle_timeout {
        return Err(anyhow!(
            "[dump].settle_poll_ms must not exceed [dump].settle_timeout_secs"
        ));
    }

    if settings.store_path.as_os_str().is_empty() {
        return Err(anyhow!("[store].path must not be empty"));
    }

    if settings.output_dir.as_os_str().is_empty() {
        return Err(anyhow!("[output].dir must not be empty"));
    }

    Ok(())
}
