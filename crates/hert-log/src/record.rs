//! Log records

use chrono::{DateTime, Local};

use crate::level::LogLevel;

/// Name used for records logged through the facade directly
pub const DEFAULT_TARGET: &str = "hert";

/// Where a record was logged from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Source path as given by `file!()`
    pub file: String,
    pub line: u32,
    /// Enclosing function or module path
    pub function: String,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// File name without its directories
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file)
    }
}

/// One formatted log line, as seen by sinks and handlers
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    /// The formatted message, without location
    pub message: String,
    pub location: Option<Location>,
    /// Logger name: `hert` for facade calls, the `log` target for bridged records
    pub target: String,
    /// Thread name, or its id when unnamed
    pub thread: String,
    pub time: DateTime<Local>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let current = std::thread::current();
        let thread = match current.name() {
            Some(name) => name.to_string(),
            None => format!("{:?}", current.id()),
        };
        Self {
            level,
            message: message.into(),
            location: None,
            target: DEFAULT_TARGET.to_string(),
            thread,
            time: Local::now(),
        }
    }

    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}
