//! File system paths for the playa data layer.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name created under the user's home directory.
const BASE_DIR_NAME: &str = ".playa";
/// Preferences filename under the base directory.
const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Manages file system paths for the data layer.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.playa)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.playa`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.playa).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.playa/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the database file path for the given database name.
    pub fn database_file(&self, database_name: &str) -> PathBuf {
        self.base_dir.join(database_name)
    }

    /// Get the preferences file path (~/.playa/preferences.json).
    pub fn preferences_file(&self) -> PathBuf {
        self.base_dir.join(PREFERENCES_FILE_NAME)
    }

    /// Get the logs directory (~/.playa/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
