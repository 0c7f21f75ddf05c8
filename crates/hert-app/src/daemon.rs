//! Process-wide daemon
//!
//! The daemon records the program arguments once and tracks whether the
//! program's background services are running.

use hert_core::singleton;
use parking_lot::RwLock;

pub struct Daemon {
    args: RwLock<Option<Vec<String>>>,
}

singleton!(Daemon);

impl Daemon {
    fn new() -> Self {
        log::debug!("Daemon created");
        Self {
            args: RwLock::new(None),
        }
    }

    /// Record `args` and mark the daemon running.
    ///
    /// A second call while running is ignored with a warning and keeps the
    /// first arguments.
    pub fn initialize(&self, args: Vec<String>) {
        let mut current = self.args.write();
        if current.is_some() {
            log::warn!("Daemon already initialized");
            return;
        }
        *current = Some(args);
        log::debug!("Daemon initialized");
    }

    /// Stop the daemon; does nothing if it is not running
    pub fn stop(&self) {
        let mut current = self.args.write();
        if current.take().is_some() {
            log::debug!("Daemon stopped");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.args.read().is_some()
    }

    /// Arguments given to [`Daemon::initialize`], empty when not running
    pub fn args(&self) -> Vec<String> {
        self.args.read().clone().unwrap_or_default()
    }
}
