//! Configuration management for the data layer.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default log level.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default database file name under the base directory.
const DEFAULT_DATABASE_NAME: &str = "playaDatabase.sqlite";

const DEFAULT_LIVE_QUERY_BUFFER: usize = 1;
const DEFAULT_CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Pacific daylight time, the festival's clock in late August.
const DEFAULT_FESTIVAL_UTC_OFFSET_MINUTES: i32 = -7 * 60;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Main data layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Database file name, resolved against [`Paths::base_dir`].
    #[serde(default = "default_database_name")]
    pub database_name: String,
    /// Pre-populated database copied into place on first run.
    #[serde(default)]
    pub bundled_database: Option<PathBuf>,
    /// Number of undelivered snapshots a live query may buffer.
    #[serde(default = "default_live_query_buffer")]
    pub live_query_buffer: usize,
    /// Capacity of the table-change broadcast channel.
    #[serde(default = "default_change_channel_capacity")]
    pub change_channel_capacity: usize,
    /// Offset of the festival's local clock from UTC. Event days are
    /// festival days, so an 8 PM event belongs to the day it starts on there.
    #[serde(default = "default_festival_utc_offset_minutes")]
    pub festival_utc_offset_minutes: i32,
    /// Creation time of the bundled content in unix millis, recorded in the
    /// preferences on open. 0 when no content drop has been stamped.
    #[serde(default)]
    pub resources_version: i64,
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

fn default_live_query_buffer() -> usize {
    DEFAULT_LIVE_QUERY_BUFFER
}

fn default_change_channel_capacity() -> usize {
    DEFAULT_CHANGE_CHANNEL_CAPACITY
}

fn default_festival_utc_offset_minutes() -> i32 {
    DEFAULT_FESTIVAL_UTC_OFFSET_MINUTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            database_name: default_database_name(),
            bundled_database: None,
            live_query_buffer: DEFAULT_LIVE_QUERY_BUFFER,
            change_channel_capacity: DEFAULT_CHANGE_CHANNEL_CAPACITY,
            festival_utc_offset_minutes: DEFAULT_FESTIVAL_UTC_OFFSET_MINUTES,
            resources_version: 0,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the data layer cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.database_name.trim().is_empty() {
            return Err(CoreError::Config("database_name is empty".to_string()));
        }
        if self.live_query_buffer == 0 {
            return Err(CoreError::Config("live_query_buffer must be at least 1".to_string()));
        }
        if self.change_channel_capacity == 0 {
            return Err(CoreError::Config(
                "change_channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.festival_utc_offset_minutes.abs() >= MINUTES_PER_DAY {
            return Err(CoreError::Config(format!(
                "festival_utc_offset_minutes {} is a day or more",
                self.festival_utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("PLAYA_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }
}
