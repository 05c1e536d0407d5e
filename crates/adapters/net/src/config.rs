//! Network adapter configuration.

use serde::Deserialize;

/// Upstream feed connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed host name or IP address.
    pub host: String,
    /// Feed TCP port.
    pub port: u16,
    /// Fixed backoff between reconnect attempts, in seconds.
    pub reconnect_secs: u64,
    /// How long to wait for the response to a `?` request before sending
    /// the next queued one, in milliseconds.
    pub response_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            reconnect_secs: 5,
            response_timeout_ms: 2500,
        }
    }
}

/// Operator console listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Whether to run the console listener at all.
    pub enabled: bool,
    /// Address to bind to.
    pub host: String,
    /// Console TCP port.
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 9001,
        }
    }
}
