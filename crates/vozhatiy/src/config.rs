//! Configuration management for vozhatiy.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::analytics::DayMeanMode;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "vozhatiy";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "camp.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `VOZHATIY_`, sections split by `__`)
/// 2. TOML config file at `~/.config/vozhatiy/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Analytics configuration.
    pub analytics: AnalyticsConfig,
    /// Reminder configuration.
    pub reminders: RemindersConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/vozhatiy/camp.db`
    pub database_path: Option<PathBuf>,
}

/// Analytics-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// How per-day mean rates are computed.
    pub day_mean_mode: DayMeanMode,
    /// Entries shown in ranked views when no limit is given.
    pub top_n: usize,
    /// Days covered by a report when no range is given.
    pub default_range_days: u32,
}

/// Reminder-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// How far ahead upcoming reminders are listed, in hours.
    pub horizon_hours: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            day_mean_mode: DayMeanMode::Deferred,
            top_n: 5,
            default_range_days: 7,
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self { horizon_hours: 24 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("VOZHATIY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("analytics.top_n", self.analytics.top_n > 0),
            (
                "analytics.default_range_days",
                self.analytics.default_range_days > 0,
            ),
            ("reminders.horizon_hours", self.reminders.horizon_hours > 0),
        ];

        match positive.iter().find(|(_, ok)| !ok) {
            Some((key, _)) => Err(Error::ConfigValidation {
                message: format!("{key} must be greater than 0"),
            }),
            None => Ok(()),
        }
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the reminder horizon as a duration.
    #[must_use]
    pub fn reminder_horizon(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.reminders.horizon_hours))
    }
}
