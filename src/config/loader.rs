// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::config::model::{ConfigFile, Settings};
use crate::config::validate::validate_settings;

/// Load a configuration file from a given path and return the raw
/// [`ConfigFile`].
///
/// A missing file is not an error: everything in the config has a default or
/// an environment fallback, so covsched can run from environment variables
/// alone.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();

    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading config file at {:?}", path));
        }
    };

    let config: ConfigFile =
        toml::from_str(&contents).with_context(|| format!("parsing TOML config from {:?}", path))?;

    Ok(config)
}

/// Load the config file, merge environment overrides, and validate.
///
/// This is the recommended entry point for the rest of the application.
/// Environment variables consulted:
/// - `JACOCO_HOME` when `[tool].jacoco_home` is unset.
/// - `TARGET_HOME` when `[target].classfiles` / `[target].sourcefiles` are
///   unset (deriving `target/classes` and `src/main/java` below it).
pub fn load_and_resolve(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    let settings = resolve(&raw)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Merge a raw [`ConfigFile`] with environment fallbacks into [`Settings`].
pub fn resolve(raw: &ConfigFile) -> Result<Settings> {
    let jacoco_home = raw
        .tool
        .jacoco_home
        .clone()
        .or_else(|| env_path("JACOCO_HOME"))
        .ok_or_else(|| {
            anyhow!("coverage tool location unknown: set [tool].jacoco_home or JACOCO_HOME")
        })?;

    let target_home = env_path("TARGET_HOME");

    let classfiles = raw
        .target
        .classfiles
        .clone()
        .or_else(|| target_home.as_ref().map(|t| t.join("target").join("classes")))
        .ok_or_else(|| {
            anyhow!("compiled-class directory unknown: set [target].classfiles or TARGET_HOME")
        })?;

    let sourcefiles = raw
        .target
        .sourcefiles
        .clone()
        .or_else(|| {
            target_home
                .as_ref()
                .map(|t| t.join("src").join("main").join("java"))
        })
        .ok_or_else(|| {
            anyhow!("source directory unknown: set [target].sourcefiles or TARGET_HOME")
        })?;

    Ok(Settings {
        java: raw.tool.java.clone(),
        jacoco_home,
        agent_host: raw.agent.host.clone(),
        agent_port: raw.agent.port,
        classfiles,
        sourcefiles,
        output_dir: raw.output.dir.clone(),
        store_path: raw.store.path.clone(),
        update_cooldown: Duration::from_secs(raw.cooldown.update_secs),
        clear_cooldown: Duration::from_secs(raw.cooldown.clear_secs),
        dump_settle_poll: Duration::from_millis(raw.dump.settle_poll_ms),
        dump_settle_timeout: Duration::from_secs(raw.dump.settle_timeout_secs),
        dump_fallback_delay: Duration::from_secs(raw.dump.fallback_delay_secs),
    })
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).map(PathBuf::from)
}
