//! Error types for the status server.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur while configuring or starting the status server.
///
/// None of these cross the non-strict start path: they are logged and the
/// server is left non-serving.
#[derive(Debug, Error)]
pub enum StatusServerError {
    /// The listening socket could not be created or bound.
    #[error("failed to bind status server at {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The async runtime backing the listener could not be built.
    #[error("failed to build listener runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The listener thread could not be spawned.
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Log files could not be opened, or the logger was already initialized.
    #[error("logger initialization failed: {0}")]
    Logger(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatusServerError>;
