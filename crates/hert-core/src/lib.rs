//! hert-core: Crash guard and process-wide helpers
//!
//! This crate provides the pieces every hert program installs at startup:
//! - Fault signal interception with stack traces and a crash callback
//! - Lazily constructed singleton services
//! - Library version information

pub mod dump;
pub mod singleton;
pub mod version;

pub use dump::{CrashCallback, StackOptions};
pub use singleton::Singleton;
pub use version::version;
