//! Configuration management for the Depot server.
//!
//! TOML-based configuration with defaults for every field. The default
//! configuration path is `~/.config/depot/config.toml`. Environment
//! variables override file values; CLI flags override both (applied by the
//! binary).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("port must be non-zero")]
    InvalidPort,

    #[error("max_upload_size must be greater than 0, got {0}")]
    InvalidMaxUploadSize(u64),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the Depot server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP listener configuration.
    pub server: ServerConfig,

    /// Uploads root and transfer limits.
    pub storage: StorageConfig,

    /// User store location.
    pub auth: AuthConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,

    /// Port to listen on.
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Uploads root and transfer limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory every file operation is sandboxed to. Created at startup
    /// if missing.
    pub root: PathBuf,

    /// Maximum accepted upload size in bytes.
    pub max_upload_size: u64,
}

/// User store location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Path to the users JSON file.
    pub users_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./uploads"),
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depot")
        .join("config.toml")
}

/// Returns the default users file path.
fn default_users_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depot")
        .join("users.json")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - DEPOT_PORT: Override the listening port
    /// - DEPOT_ROOT: Override the uploads root
    /// - DEPOT_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("DEPOT_PORT") {
            if !port.is_empty() {
                match port.parse::<u16>() {
                    Ok(port) => {
                        tracing::info!("Overriding port from environment: {}", port);
                        self.server.port = port;
                    }
                    Err(_) => {
                        tracing::warn!("Ignoring invalid DEPOT_PORT value: {}", port);
                    }
                }
            }
        }

        if let Ok(root) = std::env::var("DEPOT_ROOT") {
            if !root.is_empty() {
                tracing::info!("Overriding uploads root from environment: {}", root);
                self.storage.root = PathBuf::from(root);
            }
        }

        if let Ok(level) = std::env::var("DEPOT_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.server.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.storage.max_upload_size == 0 {
            return Err(ConfigError::InvalidMaxUploadSize(
                self.storage.max_upload_size,
            ));
        }

        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", e.message()))
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.root, PathBuf::from("./uploads"));
        assert_eq!(config.storage.max_upload_size, 100 * 1024 * 1024);
        assert!(config.auth.users_file.to_string_lossy().contains("depot"));
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[server]
port = 8080
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.root, PathBuf::from("./uploads"));
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[server]
bind = "127.0.0.1"
port = 9000
log_level = "debug"

[storage]
root = "/srv/depot"
max_upload_size = 52428800

[auth]
users_file = "/etc/depot/users.json"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.root, PathBuf::from("/srv/depot"));
        assert_eq!(config.storage.max_upload_size, 52428800);
        assert_eq!(
            config.auth.users_file,
            PathBuf::from("/etc/depot/users.json")
        );
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("[server\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let result = Config::from_toml("[server]\nport = \"not a number\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.server.port = 4242;
        original.server.log_level = "debug".to_string();

        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid [ toml").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort));
    }

    #[test]
    fn test_validate_zero_upload_size() {
        let mut config = Config::default();
        config.storage.max_upload_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxUploadSize(0)));
    }

    #[test]
    fn test_validate_log_levels() {
        let mut config = Config::default();
        for level in ["trace", "debug", "info", "warn", "error", "WARN"] {
            config.server.log_level = level.to_string();
            assert!(config.validate().is_ok(), "level {level} should be valid");
        }

        config.server.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_env_override_port() {
        std::env::set_var("DEPOT_PORT", "8181");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 8181);

        std::env::remove_var("DEPOT_PORT");
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_port_ignored() {
        std::env::set_var("DEPOT_PORT", "not-a-port");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 3000);

        std::env::remove_var("DEPOT_PORT");
    }

    #[test]
    #[serial]
    fn test_env_override_root_and_log_level() {
        std::env::set_var("DEPOT_ROOT", "/srv/files");
        std::env::set_var("DEPOT_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.storage.root, PathBuf::from("/srv/files"));
        assert_eq!(config.server.log_level, "trace");

        std::env::remove_var("DEPOT_ROOT");
        std::env::remove_var("DEPOT_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("DEPOT_ROOT", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.storage.root, PathBuf::from("./uploads"));

        std::env::remove_var("DEPOT_ROOT");
    }

    #[test]
    fn test_default_config_path_location() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("depot"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
