//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/somnolog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/somnolog/` (~/.config/somnolog/)
//! - Data: `$XDG_DATA_HOME/somnolog/` (~/.local/share/somnolog/)
//! - State/Logs: `$XDG_STATE_HOME/somnolog/` (~/.local/state/somnolog/)

use crate::analytics::ranking::DEFAULT_MIN_SAMPLE;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics defaults
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Log collection storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for ranking, range filtering and trends
#[derive(Debug, Deserialize)]
pub struct AnalyticsConfig {
    /// Tags seen fewer times than this are left out of impact rankings
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u32,

    /// Length of top-positive / top-negative lists
    #[serde(default = "default_top_count")]
    pub top_count: usize,

    /// Trailing window used when no range is given (0 = all logs)
    #[serde(default = "default_range_days")]
    pub default_range_days: u32,

    /// Number of distinct dates shown in the daily trend
    #[serde(default = "default_trend_days")]
    pub trend_days: usize,

    /// Number of tags listed in incidence views
    #[serde(default = "default_incidence_limit")]
    pub incidence_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_sample_size: default_min_sample_size(),
            top_count: default_top_count(),
            default_range_days: default_range_days(),
            trend_days: default_trend_days(),
            incidence_limit: default_incidence_limit(),
        }
    }
}

fn default_min_sample_size() -> u32 {
    DEFAULT_MIN_SAMPLE
}

fn default_top_count() -> usize {
    5
}

fn default_range_days() -> u32 {
    30
}

fn default_trend_days() -> usize {
    30
}

fn default_incidence_limit() -> usize {
    10
}

/// Where the log collection lives
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the JSON log file (default: data dir)
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the analytics engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.analytics.top_count == 0 {
            return Err(Error::Config(
                "analytics.top_count must be at least 1".to_string(),
            ));
        }
        if self.analytics.trend_days == 0 {
            return Err(Error::Config(
                "analytics.trend_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the log collection path, honouring `storage.path`
    pub fn logs_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(Self::default_logs_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/somnolog/config.toml` (~/.config/somnolog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("somnolog").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/somnolog/` (~/.local/share/somnolog/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("somnolog")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/somnolog/` (~/.local/state/somnolog/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("somnolog")
    }

    /// Returns the default sleep log collection path
    ///
    /// `$XDG_DATA_HOME/somnolog/logs.json` (~/.local/share/somnolog/logs.json)
    pub fn default_logs_path() -> PathBuf {
        Self::data_dir().join("logs.json")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
