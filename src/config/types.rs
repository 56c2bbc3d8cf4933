// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port at which status information such as build info/stats is exported.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Abort the host process when the status port cannot be bound.
    #[serde(default)]
    pub strict: bool,
    /// Tokio worker threads for the listener runtime (1 if not set)
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            strict: false,
            workers: None,
        }
    }
}

pub const DEFAULT_STATUS_PORT: u16 = 9999;

#[allow(clippy::missing_const_for_fn)]
fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    DEFAULT_STATUS_PORT
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            access_log: false,
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_level() -> String {
    "info".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PerformanceConfig {
    #[serde(default = "default_keep_alive")]
    pub keep_alive: bool,
    /// Upper bound on a single connection's lifetime, in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// How long `stop` waits for in-flight requests, in milliseconds
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: default_keep_alive(),
            connection_timeout: default_connection_timeout(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

const fn default_keep_alive() -> bool {
    true
}

const fn default_connection_timeout() -> u64 {
    30
}

const fn default_drain_timeout_ms() -> u64 {
    100
}
