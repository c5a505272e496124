//! Typed queue configuration.
//!
//! Loaded from a TOML file or from `LOCALQ_*` environment variables; fails
//! fast on missing or malformed values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};

pub const ENV_ROOT: &str = "LOCALQ_ROOT";
pub const ENV_MAX_WORKERS: &str = "LOCALQ_MAX_WORKERS";
pub const ENV_POLL_INTERVAL_MS: &str = "LOCALQ_POLL_INTERVAL_MS";
pub const ENV_LOG_LEVEL: &str = "LOCALQ_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Registry root; task types live in its subdirectories.
    pub root: PathBuf,

    /// Permission bits for created directories and files (unix only).
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,

    /// Cap on concurrently executing instances per scan cycle.
    /// `None` runs every ready instance at once.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Sleep between consumer scan cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_dir_mode() -> u32 {
    0o777
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl QueueConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir_mode: default_dir_mode(),
            max_workers: None,
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Millisecond precision; intervals beyond `u64::MAX` ms saturate.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| QueueError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| QueueError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Load from `LOCALQ_ROOT` (required), `LOCALQ_MAX_WORKERS`,
    /// `LOCALQ_POLL_INTERVAL_MS` and `LOCALQ_LOG_LEVEL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let root = lookup(ENV_ROOT).ok_or_else(|| {
            QueueError::Config(format!("required environment variable {ENV_ROOT} is not set"))
        })?;
        let mut config = Self::new(root);
        if let Some(v) = lookup(ENV_MAX_WORKERS) {
            config.max_workers = Some(parse_var(ENV_MAX_WORKERS, &v)?);
        }
        if let Some(v) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval_ms = parse_var(ENV_POLL_INTERVAL_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            config.log_level = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(QueueError::Config("root must not be empty".into()));
        }
        if self.max_workers == Some(0) {
            return Err(QueueError::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| QueueError::Config(format!("{name}={value:?}: {e}")))
}
