//! Logger module
//!
//! Provides logging utilities for the status server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Leveled error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::LogLevel;

use crate::config::LoggingConfig;
use crate::error::{Result, StatusServerError};
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup. Until then, messages go
/// straight to stdout/stderr.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = config.level.parse::<LogLevel>().map_err(|e| {
        StatusServerError::Logger(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })?;
    writer::init(
        level,
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
    .map_err(StatusServerError::Logger)
}

fn write(level: LogLevel, message: &str) {
    match writer::get() {
        Some(w) => w.write(level, message),
        None => match level {
            LogLevel::Error | LogLevel::Warn => {
                eprintln!("{}", writer::format_line(level, message));
            }
            LogLevel::Info => println!("{}", writer::format_line(level, message)),
            LogLevel::Debug => {}
        },
    }
}

pub fn log_info(message: &str) {
    write(LogLevel::Info, message);
}

pub fn log_debug(message: &str) {
    write(LogLevel::Debug, message);
}

pub fn log_warning(message: &str) {
    write(LogLevel::Warn, message);
}

pub fn log_error(message: &str) {
    write(LogLevel::Error, message);
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_server_starting(port: u16) {
    log_info(&format!("Starting status server at {port}"));
}

pub fn log_server_listening(addr: &SocketAddr) {
    log_info(&format!("Status server listening on: http://{addr}"));
}

pub fn log_start_failed(port: u16, err: &StatusServerError) {
    log_error(&format!("Failed to start status server at {port}"));
    log_error(&err.to_string());
}

pub fn log_server_stopped(port: u16) {
    log_info(&format!("Status server at {port} stopped"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_debug(&format!("Status connection closed with error: {err}"));
}
