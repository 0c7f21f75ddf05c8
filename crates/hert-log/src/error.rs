//! Logging errors

use thiserror::Error;

/// Errors from setting up or reconfiguring the logging facade
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to open log output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Another logger is already registered with the log crate")]
    LoggerAlreadySet,
}
