//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `feedgate.toml` in the working directory. Every field has a
//! sensible default so the file is optional, except the target list —
//! a gateway with nowhere to dispatch to refuses to start. Environment
//! variables take precedence over file values.

use serde::Deserialize;

use feedgate_adapter_http::config::TargetConfig;
use feedgate_adapter_net::config::{ControlConfig, FeedConfig};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream feed connection.
    pub feed: FeedConfig,
    /// Operator console listener.
    pub control: ControlConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Compiled automation script.
    pub script: ScriptConfig,
    /// Table dump file.
    pub dump: DumpConfig,
    /// Downstream HTTP targets.
    pub targets: Vec<TargetConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Script configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Path of the compiled automation script.
    pub path: String,
}

/// Dump configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Default path for table dumps (console `dump`, shutdown).
    pub path: String,
}

impl Config {
    /// Load configuration from `feedgate.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("feedgate.toml")?;
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
        if let Ok(val) = std::env::var("FEEDGATE_FEED") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.feed.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.feed.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("FEEDGATE_SCRIPT") {
            self.script.path = val;
        }
        if let Ok(val) = std::env::var("FEEDGATE_DUMP") {
            self.dump.path = val;
        }
        if let Ok(val) = std::env::var("FEEDGATE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.port == 0 {
            return Err(ConfigError::Validation(
                "feed port must be non-zero".to_string(),
            ));
        }
        if self.script.path.is_empty() {
            return Err(ConfigError::Validation(
                "script path must not be empty".to_string(),
            ));
        }
        if !self.targets.iter().any(|t| t.enabled) {
            return Err(ConfigError::Validation(
                "no enabled http targets defined".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "feedgated=info,feedgate=info".to_string(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: "automation.json".to_string(),
        }
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            path: "feedgate.dump".to_string(),
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
