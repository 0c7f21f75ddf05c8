//! Process-wide logging facade
//!
//! The facade is a set of statics: the active worker (present while
//! initialized), the current level and the handler registry. Callers format
//! and filter on their own thread, run handlers, then queue the record for the
//! worker which owns the sinks.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

use crate::bridge;
use crate::config::LogSinkConfig;
use crate::error::LogError;
use crate::level::LogLevel;
use crate::pattern::{Pattern, DEFAULT_CONSOLE_PATTERN, DEFAULT_FILE_PATTERN};
use crate::record::{Location, LogRecord};
use crate::sink::{ConsoleSink, RotatingFileSink, Sink};
use crate::worker::Worker;

/// Callback run for every emitted record, on the logging thread
pub type LogHandler = Arc<dyn Fn(&LogRecord) + Send + Sync + 'static>;

static WORKER: RwLock<Option<Worker>> = const_rwlock(None);
static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static HANDLERS: RwLock<Vec<LogHandler>> = const_rwlock(Vec::new());

/// Start logging with `config`.
///
/// Does nothing if logging is already initialized. The current level becomes
/// the lowest level of the enabled sinks; with no sink enabled it is left
/// unchanged.
pub fn initialize(config: &LogSinkConfig) -> Result<(), LogError> {
    {
        let mut active = WORKER.write();
        if active.is_some() {
            return Ok(());
        }

        let pattern = config.pattern.as_deref().map(Pattern::parse).transpose()?;

        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        if config.console_enabled {
            let pattern = match &pattern {
                Some(p) => p.clone(),
                None => Pattern::parse(DEFAULT_CONSOLE_PATTERN)?,
            };
            sinks.push(Box::new(ConsoleSink::new(config.console_level, pattern)));
        }
        if config.file_enabled {
            let pattern = match &pattern {
                Some(p) => p.clone(),
                None => Pattern::parse(DEFAULT_FILE_PATTERN)?,
            };
            sinks.push(Box::new(RotatingFileSink::new(
                &config.file_path,
                config.file_level,
                pattern,
                config.max_file_size,
                config.max_files,
            )?));
        }

        bridge::install(config.env_filter.as_deref())?;

        if let Some(level) = config.min_level() {
            store_level(level);
        }
        *active = Some(Worker::start(sinks)?);
    }

    log(LogLevel::Info, format_args!("logging initialized"), None);
    Ok(())
}

/// Flush and stop logging; handlers are dropped. A later [`initialize`]
/// starts over.
pub fn shutdown() {
    if !is_initialized() {
        return;
    }
    log(LogLevel::Info, format_args!("logging shut down"), None);

    let worker = WORKER.write().take();
    if let Some(worker) = worker {
        worker.shutdown();
    }
    HANDLERS.write().clear();
}

pub fn is_initialized() -> bool {
    WORKER.read().is_some()
}

pub fn set_level(level: LogLevel) {
    store_level(level);
}

pub fn level() -> LogLevel {
    LogLevel::from_u8(LEVEL.load(Ordering::Relaxed))
}

fn store_level(level: LogLevel) {
    LEVEL.store(level as u8, Ordering::Relaxed);
    ::log::set_max_level(level.to_level_filter());
}

/// Replace the pattern of every sink. Records queued before the call keep
/// the old pattern.
pub fn set_pattern(pattern: &str) -> Result<(), LogError> {
    let pattern = Pattern::parse(pattern)?;
    if let Some(worker) = WORKER.read().as_ref() {
        worker.set_pattern(pattern);
    }
    Ok(())
}

/// Register a handler; handlers run in registration order
pub fn add_handler(handler: LogHandler) {
    HANDLERS.write().push(handler);
}

pub fn clear_handlers() {
    HANDLERS.write().clear();
}

/// Block until every record queued so far has been written and flushed
pub fn flush() {
    if let Some(worker) = WORKER.read().as_ref() {
        worker.flush();
    }
}

/// Whether a record at `level` would be emitted
pub fn enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level >= self::level() && is_initialized()
}

/// Emit a record. Prefer the macros, which build `args` and `location`.
pub fn log(level: LogLevel, args: fmt::Arguments<'_>, location: Option<Location>) {
    if !enabled(level) {
        return;
    }
    let message = match args.as_str() {
        Some(s) => s.to_string(),
        None => args.to_string(),
    };
    dispatch(LogRecord::new(level, message).with_location(location));
}

pub(crate) fn dispatch(record: LogRecord) {
    // Snapshot so a handler may add or clear handlers
    let handlers = HANDLERS.read().clone();
    for handler in &handlers {
        if panic::catch_unwind(AssertUnwindSafe(|| handler(&record))).is_err() {
            eprintln!("[hert-log] log handler panicked");
        }
    }

    if let Some(worker) = WORKER.read().as_ref() {
        worker.send(record);
    }
}
