//! Configuration management for the Lectern binary
//!
//! This module handles loading and managing application configuration
//! from config files and environment variables. Per-player settings live in
//! [`crate::player::PlayerConfig`]; this file only covers how the host process
//! itself runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::utils::error::{PlayerError, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Host API configuration
    pub host: HostConfig,

    /// Preference store configuration
    pub storage: StorageConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Host API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Base URL prepended to relative endpoint paths
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Preference store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persist preferences to disk between runs
    pub persist: bool,

    /// Explicit preference file; defaults to the user data directory
    pub path: Option<PathBuf>,

    /// Namespace shared by all players
    pub namespace: String,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Interval between player ticks in milliseconds
    pub tick_interval_ms: u64,

    /// Mount slot used when none is given on the command line
    pub default_slot: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            storage: StorageConfig::default(),
            general: GeneralConfig::default(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 10_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: true,
            path: None,
            namespace: "VideoPlayer".to_string(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_interval_ms: 200,
            default_slot: "main".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/lectern/config.toml on Linux)
    /// 3. User config file (~/.config/lectern/config.toml on Linux)
    /// 4. Environment variables (LECTERN_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config.merge_from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file, then apply env overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.host.timeout_ms)
    }

    /// Tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.general.tick_interval_ms)
    }

    /// Where the preference store lives on disk, if persistence is on
    pub fn storage_path(&self) -> Option<PathBuf> {
        if !self.storage.persist {
            return None;
        }

        self.storage.path.clone().or_else(|| {
            dirs::data_dir().map(|p| p.join("lectern").join("preferences.json"))
        })
    }

    /// Merge configuration from a TOML file
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlayerError::Config(format!("Failed to read config file: {}", e)))?;

        let file_config: AppConfig = toml::from_str(&contents)
            .map_err(|e| PlayerError::Config(format!("Failed to parse config file: {}", e)))?;

        // Missing sections fall back to defaults through #[serde(default)],
        // so a later file replaces the earlier one wholesale.
        *self = file_config;

        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("LECTERN_HOST_BASE_URL") {
            self.host.base_url = Some(base_url);
        }

        if let Ok(timeout) = std::env::var("LECTERN_HOST_TIMEOUT_MS") {
            self.host.timeout_ms = timeout.parse()
                .map_err(|_| PlayerError::Config("Invalid LECTERN_HOST_TIMEOUT_MS".to_string()))?;
        }

        if let Ok(path) = std::env::var("LECTERN_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(log_level) = std::env::var("LECTERN_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.host.timeout_ms == 0 {
            return Err(PlayerError::Config("Host timeout must be non-zero".to_string()));
        }

        if self.general.tick_interval_ms == 0 {
            return Err(PlayerError::Config("Tick interval must be non-zero".to_string()));
        }

        if self.storage.namespace.is_empty() {
            return Err(PlayerError::Config("Storage namespace must not be empty".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/lectern/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA").ok()
            .map(|p| PathBuf::from(p).join("Lectern").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/Lectern/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lectern").join("config.toml"))
    }
}
