//! Configuration management for Lantern.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate
//! location and describes the scan roots, their per-root settings, and
//! the bookmark sources.

use crate::error::{LanternError, Result};
use crate::indexed_path::PathSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for Lantern.
///
/// ## Example Configuration File (lantern.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
///
/// [[roots]]
/// path = "/home/user/Documents"
/// mime_filters = ["inode/directory", "application/*"]
/// max_depth = 10
/// scan_interval_secs = 60
/// watch_filesystem = true
///
/// [bookmarks]
/// files = ["/home/user/.config/chromium/Default/Bookmarks"]
/// index_hostname = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Scan roots and their per-root settings
    pub roots: Vec<RootConfig>,

    /// Bookmark indexing settings
    pub bookmarks: BookmarksConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Cache directory override (None = default location)
    pub cache_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
            cache_dir: None,
        }
    }
}

/// One configured scan root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    /// The root directory to index
    pub path: PathBuf,

    /// Per-root settings
    #[serde(flatten)]
    pub settings: PathSettings,
}

impl RootConfig {
    /// Root with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RootConfig {
            path: path.into(),
            settings: PathSettings::default(),
        }
    }
}

/// Bookmark indexing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarksConfig {
    /// Bookmark source files (empty = auto-discover)
    pub files: Vec<PathBuf>,

    /// Index each bookmark under its hostname as well as its title
    pub index_hostname: bool,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| LanternError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| LanternError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "lantern").ok_or_else(|| LanternError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("lantern.toml"))
    }

    /// Get the cache directory (from config or default).
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.general.cache_dir {
            Ok(path.clone())
        } else {
            let dirs = ProjectDirs::from("", "", "lantern").ok_or_else(|| {
                LanternError::ConfigError {
                    reason: "Could not determine cache directory".to_string(),
                }
            })?;
            Ok(dirs.cache_dir().to_path_buf())
        }
    }
}
