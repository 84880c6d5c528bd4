use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::orchestration::{
    OverflowPolicy, SchedulerConfig, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONTEXT_WINDOW,
    DEFAULT_MAX_ITERATIONS,
};
use crate::{tlog_debug, Error, Result};

/// User configuration, read from `~/.taskloop/taskloop.toml`.
///
/// Every field is optional; missing fields fall back to scheduler defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub max_iterations: Option<usize>,
    pub context_window: Option<usize>,
    /// Per-call timeout in seconds. `0` disables the timeout.
    pub call_timeout_secs: Option<u64>,
    pub max_queue_len: Option<usize>,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    /// Claude command to run.
    pub command: Option<String>,
    pub model: Option<String>,
}

impl Config {
    pub fn taskloop_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskloop"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::taskloop_dir()?.join("taskloop.toml"))
    }

    pub fn effective_command(&self) -> &str {
        self.command.as_deref().unwrap_or("claude")
    }

    /// Per-call timeout, or `None` when disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        match self.call_timeout_secs.unwrap_or(DEFAULT_CALL_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Scheduler settings derived from this configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_max_iterations(self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS))
            .with_context_window(self.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW))
            .with_call_timeout(self.call_timeout())
            .with_max_queue_len(self.max_queue_len, self.overflow_policy)
    }

    /// Load from the default location, or defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        tlog_debug!("Config loaded: {:?}", config);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tlog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
