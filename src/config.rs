//! Configuration file support for paperpix.
//!
//! Settings are stored as versioned JSON: in the platform config directory on
//! native builds and in localStorage on the web.

use paperpix_gallery::{FilterThreshold, SortMode};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SERVER_URL, UNKNOWN_COUNTRY};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// localStorage key of the configuration on the web.
#[cfg(target_arch = "wasm32")]
const CONFIG_STORAGE_KEY: &str = "paperpix-config";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base URL of the extraction server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Country code used for chat and the leaderboard
    #[serde(default = "default_country")]
    pub country: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_country() -> String {
    UNKNOWN_COUNTRY.to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserPreferences {
    /// Where downloads are written (native only; empty means current directory)
    #[serde(default)]
    pub download_dir: String,

    /// Initial size filter threshold
    #[serde(default)]
    pub filter_threshold: FilterThreshold,

    /// Initial gallery sort mode
    #[serde(default)]
    pub sort_mode: SortMode,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            server_url: default_server_url(),
            country: default_country(),
            preferences: UserPreferences::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "paperpix-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("paperpix").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("paperpix")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Option<Self> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to a file, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Read the configuration stored in the browser (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        use crate::storage::{KeyValueStore, LocalStorage};

        let stored = LocalStorage::open().and_then(|store| store.get(CONFIG_STORAGE_KEY));
        let json = match stored {
            Ok(Some(json)) => json,
            Ok(None) => {
                log::debug!("No stored configuration");
                return None;
            }
            Err(e) => {
                log::warn!("Cannot read stored configuration: {}", e);
                return None;
            }
        };
        Self::from_json(&json)
            .map_err(|e| log::warn!("Ignoring stored configuration: {}", e))
            .ok()
    }

    /// Store the configuration in the browser (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        use crate::storage::{KeyValueStore, LocalStorage};

        let json = self.to_json()?;
        LocalStorage::open()
            .and_then(|mut store| store.set(CONFIG_STORAGE_KEY, &json))
            .map_err(|e| ConfigError::StorageError(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Storage error (localStorage in WASM)
    #[error("Storage error: {0}")]
    StorageError(String),
}
