// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [tool]
/// jacoco_home = "/opt/jacoco"
///
/// [agent]
/// host = "127.0.0.1"
/// port = 6300
///
/// [target]
/// classfiles = "/srv/app/target/classes"
/// sourcefiles = "/srv/app/src/main/java"
///
/// [cooldown]
/// update_secs = 10
/// clear_secs = 30
/// ```
///
/// All sections are optional; tool and target locations may instead come from
/// the `JACOCO_HOME` / `TARGET_HOME` environment variables (see `loader.rs`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub tool: ToolSection,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub target: TargetSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub cooldown: CooldownSection,

    #[serde(default)]
    pub dump: DumpSection,
}

/// `[tool]` section: how to invoke the external coverage CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSection {
    /// Java launcher used to run the CLI jar.
    #[serde(default = "default_java")]
    pub java: String,

    /// JaCoCo installation root; `lib/jacococli.jar` is expected below it.
    /// Falls back to the `JACOCO_HOME` environment variable.
    #[serde(default)]
    pub jacoco_home: Option<PathBuf>,
}

fn default_java() -> String {
    "java".to_string()
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            java: default_java(),
            jacoco_home: None,
        }
    }
}

/// `[agent]` section: where the instrumentation agent listens for dumps.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_host")]
    pub host: String,

    #[serde(default = "default_agent_port")]
    pub port: u16,
}

fn default_agent_host() -> String {
    "127.0.0.1".to_string()
}

fn default_agent_port() -> u16 {
    6300
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            host: default_agent_host(),
            port: default_agent_port(),
        }
    }
}

/// `[target]` section: the instrumented application's build tree.
///
/// When unset, both paths are derived from `TARGET_HOME`:
/// `<TARGET_HOME>/target/classes` and `<TARGET_HOME>/src/main/java`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetSection {
    #[serde(default)]
    pub classfiles: Option<PathBuf>,

    #[serde(default)]
    pub sourcefiles: Option<PathBuf>,
}

/// `[output]` section: root under which per-job report directories live.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// `[store]` section: where job definitions are persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("jobs.toml")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// `[cooldown]` section: minimum seconds between manual triggers.
#[derive(Debug, Clone, Deserialize)]
pub struct CooldownSection {
    #[serde(default = "default_update_cooldown_secs")]
    pub update_secs: u64,

    #[serde(default = "default_clear_cooldown_secs")]
    pub clear_secs: u64,
}

fn default_update_cooldown_secs() -> u64 {
    10
}

fn default_clear_cooldown_secs() -> u64 {
    30
}

impl Default for CooldownSection {
    fn default() -> Self {
        Self {
            update_secs: default_update_cooldown_secs(),
            clear_secs: default_clear_cooldown_secs(),
        }
    }
}

/// `[dump]` section: how long to let the agent flush exec data before the
/// report step consumes it.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpSection {
    /// Poll interval while waiting for the exec file to stabilise.
    #[serde(default = "default_settle_poll_ms")]
    pub settle_poll_ms: u64,

    /// How long to poll before giving up on stabilisation.
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,

    /// Fixed wait applied after a failed stabilisation poll (degraded mode).
    #[serde(default = "default_fallback_delay_secs")]
    pub fallback_delay_secs: u64,
}

fn default_settle_poll_ms() -> u64 {
    200
}

fn default_settle_timeout_secs() -> u64 {
    5
}

fn default_fallback_delay_secs() -> u64 {
    3
}

impl Default for DumpSection {
    fn default() -> Self {
        Self {
            settle_poll_ms: default_settle_poll_ms(),
            settle_timeout_secs: default_settle_timeout_secs(),
            fallback_delay_secs: default_fallback_delay_secs(),
        }
    }
}

/// Fully resolved settings: config file merged with environment overrides,
/// with all required locations present.
#[derive(Debug, Clone)]
pub struct Settings {
    pub java: String,
    pub jacoco_home: PathBuf,
    pub agent_host: String,
    pub agent_port: u16,
    pub classfiles: PathBuf,
    pub sourcefiles: PathBuf,
    pub output_dir: PathBuf,
    pub store_path: PathBuf,
    pub update_cooldown: Duration,
    pub clear_cooldown: Duration,
    pub dump_settle_poll: Duration,
    pub dump_settle_timeout: Duration,
    pub dump_fallback_delay: Duration,
}

impl Settings {
    /// Path of the coverage CLI jar under the tool installation.
    pub fn cli_jar(&self) -> PathBuf {
        self.jacoco_home.join("lib").join("jacococli.jar")
    }
}
