//! Configuration loading — TOML file with environment variable overrides.
//!
//! Reads `taghub.toml` from the working directory unless another path is
//! given on the command line. Every field has a sensible default so the file
//! is optional. Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use taghub_adapter_netatmo::NetatmoConfig;

/// Default configuration file name.
pub const DEFAULT_PATH: &str = "taghub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Netatmo integration settings.
    pub netatmo: NetatmoConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TAGHUB_HOME_STATUS") {
            self.netatmo.home_status_path = val.into();
        }
        if let Ok(val) = std::env::var("TAGHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.netatmo.scan_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "netatmo.scan_interval_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between two Netatmo refreshes.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.netatmo.scan_interval_secs))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "taghubd=info,taghub_app=info,taghub_adapter_netatmo=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
