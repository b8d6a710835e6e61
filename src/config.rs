//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/secmar",
//!   "quarantine_dir": "/var/lib/secmar/quarantine",
//!   "actor": "operator",
//!   "log_format": "json",
//!   "log_level": "info",
//!   "max_quarantine_attempts": 5
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::errors::Severity;
use crate::ingest::DEFAULT_QUARANTINE_ATTEMPTS;
use crate::observability::LogFormat;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "./secmar.json";

/// Configuration errors; the process must not start
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "SECMAR_CONFIG_INVALID"
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: PathBuf,

    /// Quarantine directory (optional, default `<data_dir>/quarantine`)
    #[serde(default)]
    pub quarantine_dir: Option<PathBuf>,

    /// Identity recorded on operator mutations (optional, default "operator")
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Log line format (optional, default "text")
    #[serde(default)]
    pub log_format: LogFormat,

    /// Level filter when `RUST_LOG` is unset (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Quarantine names tried on collision (optional, default 5)
    #[serde(default = "default_max_quarantine_attempts")]
    pub max_quarantine_attempts: usize,
}

fn default_actor() -> String {
    "operator".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_quarantine_attempts() -> usize {
    DEFAULT_QUARANTINE_ATTEMPTS
}

impl Config {
    /// Config rooted at `data_dir` with every optional key defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            quarantine_dir: None,
            actor: default_actor(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            max_quarantine_attempts: default_max_quarantine_attempts(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if self.actor.trim().is_empty() {
            return Err(ConfigError::Invalid("actor must not be blank".into()));
        }
        if self.max_quarantine_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_quarantine_attempts must be > 0".into(),
            ));
        }
        EnvFilter::try_new(&self.log_level).map_err(|e| {
            ConfigError::Invalid(format!("invalid log_level '{}': {}", self.log_level, e))
        })?;
        Ok(())
    }

    /// Directory holding the record store journal
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// Directory holding quarantine entries
    pub fn quarantine_path(&self) -> PathBuf {
        self.quarantine_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("quarantine"))
    }
}
