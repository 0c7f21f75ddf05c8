//! CLI argument parsing for hello-hert

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use hert_log::LogLevel;

/// hello-hert - demo program for the hert crash guard and logging facade
#[derive(Parser, Debug)]
#[command(name = "hello-hert")]
#[command(about = "Demo program for the hert crash guard and logging facade")]
#[command(version)]
pub struct Cli {
    /// Config file (default: hert.toml in the platform config directory)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Directory where core dumps are expected
    #[arg(long = "core-dir")]
    pub core_dir: Option<PathBuf>,

    /// Log level for every sink
    #[arg(long = "log-level")]
    pub log_level: Option<LogLevel>,

    /// Also log to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Number of simulated button clicks
    #[arg(long = "clicks", default_value_t = 1)]
    pub clicks: u32,

    /// Crash the program from inside the event loop
    #[arg(long = "crash", value_enum)]
    pub crash: Option<CrashKind>,

    /// What the crash callback does
    #[arg(long = "callback", value_enum, default_value_t = CallbackKind::Print)]
    pub callback: CallbackKind,

    /// Print a stack trace and exit
    #[arg(long = "trace")]
    pub trace: bool,
}

/// How to crash
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashKind {
    /// Raise SIGSEGV
    Segv,
    /// Raise SIGABRT
    Abort,
    /// Raise SIGFPE
    Fpe,
    /// Raise SIGILL
    Ill,
    /// Raise SIGBUS
    Bus,
    /// Panic inside an event
    Panic,
}

/// Behaviour of the crash callback
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    /// Print a line to stderr
    Print,
    /// Install no callback
    None,
    /// Panic inside the callback
    Panic,
    /// Raise SIGSEGV inside the callback
    Fault,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["hello-hert"]);
        assert!(cli.config.is_none());
        assert!(cli.core_dir.is_none());
        assert!(cli.log_level.is_none());
        assert!(cli.log_file.is_none());
        assert_eq!(cli.clicks, 1);
        assert!(cli.crash.is_none());
        assert_eq!(cli.callback, CallbackKind::Print);
        assert!(!cli.trace);
    }

    #[test]
    fn test_crash_options() {
        let cli = Cli::parse_from(["hello-hert", "--crash", "abort", "--callback", "fault"]);
        assert_eq!(cli.crash, Some(CrashKind::Abort));
        assert_eq!(cli.callback, CallbackKind::Fault);
    }

    #[test]
    fn test_paths_and_level() {
        let cli = Cli::parse_from([
            "hello-hert",
            "--core-dir",
            "/tmp/cores",
            "--log-file",
            "/tmp/hert.log",
            "--log-level",
            "debug",
            "--clicks",
            "3",
        ]);
        assert_eq!(cli.core_dir, Some(PathBuf::from("/tmp/cores")));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/hert.log")));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.clicks, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["hello-hert", "--crash", "explode"]).is_err());
        assert!(Cli::try_parse_from(["hello-hert", "--log-level", "loud"]).is_err());
        assert!(Cli::try_parse_from(["hello-hert", "--clicks", "-1"]).is_err());
    }
}
