// Configuration module entry point
// Loads the status server configuration from file and environment

mod types;

use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, StatusServerError};

pub use types::{Config, LoggingConfig, PerformanceConfig, ServerConfig, DEFAULT_STATUS_PORT};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "status_server";

/// Environment prefix, e.g. `STATUS__SERVER__PORT=19999`
const ENV_PREFIX: &str = "STATUS";

impl Config {
    /// Load configuration from the default file, if present, and environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension).
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parse configuration from a TOML string, ignoring the environment
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| StatusServerError::InvalidAddress(format!("{}: {e}", self.server.host)))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(!cfg.server.strict);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.performance.drain_timeout_ms, 100);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.server, ServerConfig::default());
        assert_eq!(cfg.logging, LoggingConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 18080
            strict = true

            [logging]
            access_log = true
            access_log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 18080);
        assert!(cfg.server.strict);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(cfg.logging.access_log);
        assert_eq!(cfg.logging.access_log_format, "json");
        assert!(cfg.performance.keep_alive);
    }

    #[test]
    fn test_get_socket_addr() {
        let mut cfg = Config::default();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.port = 12345;
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:12345".parse::<SocketAddr>().unwrap()
        );

        cfg.server.host = "not-an-ip".to_string();
        assert!(matches!(
            cfg.get_socket_addr(),
            Err(StatusServerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let cfg = Config::load_from("/nonexistent/status_server_test_config").unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
    }
}
