//! Configuration management
//!
//! Handles loading and saving `hert.toml`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use hert_log::LogSinkConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoConfigDir,
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HertConfig {
    /// Logging outputs
    pub log: LogSinkConfig,
    /// Crash guard settings
    pub dump: DumpConfig,
}

/// Crash guard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DumpConfig {
    /// Where core dumps are expected (None = program default)
    pub core_dump_dir: Option<PathBuf>,
}

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "hert", "hert").map(|p| p.config_dir().to_path_buf())
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("hert.toml"))
}

/// Load configuration from the platform config directory
pub fn load_config() -> Result<HertConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

/// Load configuration from `path`, falling back to defaults if it does not exist
pub fn load_config_from(path: &Path) -> Result<HertConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(HertConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the platform config directory
pub fn save_config(config: &HertConfig) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_config_to(config, &path)
}

/// Save configuration to `path`, creating its parent directories
pub fn save_config_to(config: &HertConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, &content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hert_log::LogLevel;

    #[test]
    fn test_default_config() {
        let config = HertConfig::default();
        assert!(config.log.console_enabled);
        assert!(config.dump.core_dump_dir.is_none());
    }

    #[test]
    fn test_config_serialize() {
        let config = HertConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("[log]"));
        assert!(serialized.contains("console_level = \"info\""));
    }

    #[test]
    fn test_config_path_name() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "hert.toml");
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, HertConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hert.toml");

        let mut config = HertConfig::default();
        config.log.file_enabled = true;
        config.log.file_level = LogLevel::Trace;
        config.log.pattern = Some("%l %v".to_string());
        config.dump.core_dump_dir = Some(dir.path().join("cores"));

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hert.toml");
        std::fs::write(
            &path,
            r#"
[dump]
core_dump_dir = "/tmp/hert-cores"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.dump.core_dump_dir, Some(PathBuf::from("/tmp/hert-cores")));
        assert_eq!(config.log, LogSinkConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hert.toml");
        std::fs::write(&path, "[log\nconsole_enabled = ").unwrap();

        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
