//! Forwarding of `log` crate records into the facade
//!
//! The bridge is registered with `log` once per process; the directive
//! filter it applies is replaced on every initialize.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{Log, Metadata, Record};
use parking_lot::{const_rwlock, RwLock};

use crate::error::LogError;
use crate::level::LogLevel;
use crate::logger;
use crate::record::{Location, LogRecord};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// `RUST_LOG`-style directives; `None` accepts every target
static FILTER: RwLock<Option<env_logger::Logger>> = const_rwlock(None);

struct Bridge;

impl Log for Bridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if !logger::enabled(LogLevel::from(metadata.level())) {
            return false;
        }
        match FILTER.read().as_ref() {
            Some(filter) => filter.enabled(metadata),
            None => true,
        }
    }

    fn log(&self, record: &Record) {
        if !logger::enabled(LogLevel::from(record.level())) {
            return;
        }
        if let Some(filter) = FILTER.read().as_ref() {
            if !filter.matches(record) {
                return;
            }
        }

        let location = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(Location::new(
                file,
                line,
                record.module_path().unwrap_or(record.target()),
            )),
            _ => None,
        };
        let entry = LogRecord::new(LogLevel::from(record.level()), record.args().to_string())
            .with_location(location)
            .with_target(record.target());
        logger::dispatch(entry);
    }

    fn flush(&self) {
        logger::flush();
    }
}

/// Register the bridge if this process has not yet, and apply `directives`
pub(crate) fn install(directives: Option<&str>) -> Result<(), LogError> {
    *FILTER.write() = directives
        .filter(|d| !d.trim().is_empty())
        .map(|d| env_logger::Builder::new().parse_filters(d).build());

    if INSTALLED.load(Ordering::Acquire) {
        return Ok(());
    }
    log::set_boxed_logger(Box::new(Bridge)).map_err(|_| LogError::LoggerAlreadySet)?;
    INSTALLED.store(true, Ordering::Release);
    Ok(())
}
