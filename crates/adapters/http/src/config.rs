//! HTTP target configuration.

use serde::Deserialize;

/// One downstream HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Label used in logs and the console's `list targets`.
    pub name: String,
    /// Base URL; action paths are appended to it.
    pub url: String,
    /// Disabled targets stay configured but receive nothing.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Errors from validating the target list.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// A target's base URL did not parse.
    #[error("target {name} has an invalid url: {reason}")]
    InvalidUrl { name: String, reason: String },
}

impl TargetConfig {
    /// Parse and validate the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::InvalidUrl`] when the URL is malformed.
    pub fn base_url(&self) -> Result<reqwest::Url, TargetError> {
        self.url.parse().map_err(|err| TargetError::InvalidUrl {
            name: self.name.clone(),
            reason: format!("{err}"),
        })
    }
}
