use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{ConfigError, ExponentialBackoff, DEFAULT_TIMEOUT};

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// First backoff delay in seconds (e.g. 0.25 = 250ms).
    pub initial_delay_secs: f64,
    /// Upper bound on any single backoff delay in seconds.
    pub max_delay_secs: f64,
    /// Growth factor applied to the delay after every failure.
    pub multiplier: f64,
    /// Overall budget for one run in seconds; 0 retries without limit.
    #[serde(alias = "deadline_secs")]
    pub timeout_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 1.0,
            max_delay_secs: 60.0,
            multiplier: 2.0,
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Result<ExponentialBackoff, ConfigError> {
        ExponentialBackoff::new(
            seconds("initial_delay_secs", self.initial_delay_secs)?,
            seconds("max_delay_secs", self.max_delay_secs)?,
            self.multiplier,
        )
    }

    /// `None` when the configured timeout is zero.
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        let timeout = seconds("timeout_secs", self.timeout_secs)?;
        Ok(Some(timeout).filter(|t| !t.is_zero()))
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidSeconds { field, value })
}

/// How `ferry run` and `ferry follow` treat the wrapped command (`[command]` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Exit codes worth retrying. Empty means every non-zero exit is retried.
    pub retryable_exit_codes: Vec<i32>,
}

impl CommandConfig {
    /// Whether a command that exited with `code` should be retried. `None`
    /// (killed by a signal) is only retried when no codes are listed.
    pub fn is_retryable(&self, code: Option<i32>) -> bool {
        match code {
            _ if self.retryable_exit_codes.is_empty() => true,
            Some(code) => self.retryable_exit_codes.contains(&code),
            None => false,
        }
    }
}

/// Global configuration loaded from `~/.config/ferry/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub command: CommandConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ferry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FerryConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`], for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<FerryConfig> {
    if !path.exists() {
        let default_cfg = FerryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: FerryConfig = toml::from_str(&data)?;
    // Reject bad values at load time rather than on the first retry.
    cfg.retry.backoff()?;
    cfg.retry.timeout()?;
    Ok(cfg)
}
