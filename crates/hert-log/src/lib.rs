//! hert-log: asynchronous logging facade
//!
//! One process-wide logger writing to stdout and/or a size-rotated file
//! through a background thread. Records logged through the `log` crate by
//! any crate in the process are forwarded into it once it is initialized.
//!
//! ```no_run
//! use hert_log::{LogLevel, LogSinkConfig};
//!
//! hert_log::initialize(&LogSinkConfig::default()).unwrap();
//! hert_log::info!("window opened: {}x{}", 800, 600);
//! hert_log::log_at!(LogLevel::Warn, "slow frame");
//! hert_log::shutdown();
//! ```

mod bridge;
pub mod config;
pub mod error;
pub mod level;
mod logger;
pub mod pattern;
pub mod record;
mod sink;
mod worker;

pub use config::LogSinkConfig;
pub use error::LogError;
pub use level::LogLevel;
pub use logger::{
    add_handler, clear_handlers, enabled, flush, initialize, is_initialized, level, log,
    set_level, set_pattern, shutdown, LogHandler,
};
pub use pattern::{Pattern, DEFAULT_CONSOLE_PATTERN, DEFAULT_FILE_PATTERN};
pub use record::{Location, LogRecord};

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => {
        $crate::log($crate::LogLevel::Trace, format_args!($($arg)+), None)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::log($crate::LogLevel::Debug, format_args!($($arg)+), None)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::log($crate::LogLevel::Info, format_args!($($arg)+), None)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::log($crate::LogLevel::Warn, format_args!($($arg)+), None)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::log($crate::LogLevel::Error, format_args!($($arg)+), None)
    };
}

#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::log($crate::LogLevel::Critical, format_args!($($arg)+), None)
    };
}

/// Log with the caller's file, line and module path attached
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        $crate::log(
            $level,
            format_args!($($arg)+),
            Some($crate::Location::new(file!(), line!(), module_path!())),
        )
    };
}

/// Log at critical level with location, flush, then abort the process
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        $crate::log_at!($crate::LogLevel::Critical, $($arg)+);
        $crate::flush();
        ::std::process::abort()
    }};
}
