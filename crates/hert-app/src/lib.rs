//! hert-app: application host, daemon and configuration
//!
//! This crate provides:
//! - An event-loop host that turns a panic in any event into a logged,
//!   orderly exit
//! - The process-wide daemon singleton
//! - Loading and saving of the hert configuration file

pub mod application;
pub mod config;
pub mod daemon;

pub use application::{AppContext, Application, Event, EventProxy};
pub use config::{load_config, load_config_from, save_config, save_config_to, ConfigError, DumpConfig, HertConfig};
pub use daemon::Daemon;
