//! Logging configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::level::LogLevel;

/// Which outputs the facade writes to, and at what level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Write to stdout
    pub console_enabled: bool,
    /// Minimum level for stdout
    pub console_level: LogLevel,
    /// Write to a size-rotated file
    pub file_enabled: bool,
    /// Log file path; parent directories are created
    pub file_path: PathBuf,
    /// Rotate once the file would grow past this many bytes
    pub max_file_size: u64,
    /// Number of rotated files kept next to the live one
    pub max_files: usize,
    /// Minimum level for the file
    pub file_level: LogLevel,
    /// Pattern for every sink (None = per-sink default)
    pub pattern: Option<String>,
    /// `RUST_LOG`-style directives for records arriving through the `log` crate
    pub env_filter: Option<String>,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            console_level: LogLevel::Info,
            file_enabled: false,
            file_path: PathBuf::from("hert.log"),
            max_file_size: 10 * 1024 * 1024,
            max_files: 3,
            file_level: LogLevel::Debug,
            pattern: None,
            env_filter: None,
        }
    }
}

impl LogSinkConfig {
    /// Lowest level any enabled sink accepts, or None with no sinks enabled
    pub fn min_level(&self) -> Option<LogLevel> {
        let console = self.console_enabled.then_some(self.console_level);
        let file = self.file_enabled.then_some(self.file_level);
        console.into_iter().chain(file).min()
    }
}
