//! Tracker configuration loaded from TOML.
//!
//! # Responsibility
//! - Locate and parse `config.toml`, falling back to defaults.
//! - Resolve the effective data, log directory and log level.
//!
//! # Invariants
//! - A missing default config file is not an error; a missing explicit one is.
//! - Data dir precedence: `TASKTRACK_DATA_DIR`, then `[storage] data_dir`,
//!   then the platform data dir. Command-line flags are applied by callers
//!   on top of this.

use crate::logging::{default_log_level, normalize_level};
use crate::query::filter::{DEFAULT_RECENT_DAYS, DEFAULT_UPCOMING_DAYS};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TASKTRACK_DATA_DIR";
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// SQLite database file name inside the data directory.
pub const SQLITE_FILE_NAME: &str = "tasktrack.sqlite3";

const APP_DIR_NAME: &str = "tasktrack";
const FALLBACK_DATA_DIR: &str = ".tasktrack";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid [logging] level `{0}`")]
    InvalidLogLevel(String),
}

/// Persistence backend used for tasks and parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown backend `{other}`; expected json|sqlite")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build default when absent.
    pub level: Option<String>,
    /// Absolute log directory; `<data_dir>/logs` when absent.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub recent_days: u32,
    pub upcoming_days: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            recent_days: DEFAULT_RECENT_DAYS,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub queries: QueryConfig,
}

impl TrackerConfig {
    /// Parses TOML text; `origin` is only used for error reporting.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config = toml::from_str::<Self>(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.logging.level {
            normalize_level(level).map_err(|_| ConfigError::InvalidLogLevel(level.clone()))?;
        }
        Ok(())
    }

    /// Effective data directory, honouring `TASKTRACK_DATA_DIR`.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve_data_dir(std::env::var_os(DATA_DIR_ENV))
    }

    fn resolve_data_dir(&self, env_override: Option<OsString>) -> PathBuf {
        if let Some(dir) = env_override.filter(|value| !value.is_empty()) {
            return PathBuf::from(dir);
        }
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(default_data_dir)
    }

    pub fn log_dir(&self, data_dir: &Path) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| data_dir.join(LOG_DIR_NAME))
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(default_log_level())
    }
}

/// `<config_dir>/tasktrack/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// `<data_dir>/tasktrack`, or `./.tasktrack` without a platform data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

/// Loads configuration from `explicit`, else from the default location.
///
/// # Errors
/// - `Read` when `explicit` is given but unreadable, or the default file
///   exists but cannot be read.
/// - `Parse` / `InvalidLogLevel` for malformed content.
pub fn load_config(explicit: Option<&Path>) -> Result<TrackerConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(TrackerConfig::default()),
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    TrackerConfig::from_toml_str(&text, &path)
}
