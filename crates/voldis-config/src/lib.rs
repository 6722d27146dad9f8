mod env;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Connection settings for the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL, e.g. `redis://127.0.0.1:6379`.
    pub url: String,
    /// Database index to select after connecting.
    #[serde(default)]
    pub db: i64,
    /// Optional password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Top-level voldis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    /// Directory under which every volume mountpoint is created; the
    /// mountpoint for volume `name` is always `volume_root/name`.
    pub volume_root: PathBuf,
    /// Reconciliation period in milliseconds.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

fn default_reconcile_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Parse a configuration from a YAML string.
    /// Environment variables in the format `${VAR_NAME}` will be interpolated.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let interpolated = env::interpolate_env(yaml)?;
        let config: Config = serde_yaml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Load a configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reconciliation period as a [`Duration`].
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    /// Validate the configuration, returning a list of problems.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.store.url.is_empty() {
            errors.push("store.url must not be empty".to_string());
        }
        if self.store.db < 0 {
            errors.push(format!("store.db must not be negative (got {})", self.store.db));
        }
        if self.volume_root.as_os_str().is_empty() {
            errors.push("volume_root must not be empty".to_string());
        }
        if self.reconcile_interval_ms == 0 {
            errors.push("reconcile_interval_ms must be greater than zero".to_string());
        }

        errors
    }
}
