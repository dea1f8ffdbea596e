//! Persisted preferences shared with the host application.
//!
//! Only the markers the data layer owns live here: which schema version and
//! which bundled content version are installed, and whether the location
//! embargo has been lifted.

use crate::{CoreResult, Paths};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Preferences persisted as JSON next to the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Installed database schema version.
    #[serde(default)]
    pub database_version: i64,
    /// Installed bundled-content version (unix millis of the data drop).
    #[serde(default)]
    pub resources_version: i64,
    /// Whether art, camp and event locations may be shown.
    #[serde(default)]
    pub embargo_unlocked: bool,
}

impl Preferences {
    /// Load preferences, falling back to defaults when the file is absent.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let path = paths.preferences_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save preferences to disk.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.preferences_file(), content)?;
        Ok(())
    }

    /// Record the installed schema and resources versions.
    pub fn set_versions(&mut self, database_version: i64, resources_version: i64) {
        debug!(database_version, resources_version, "Recording installed data versions");
        self.database_version = database_version;
        self.resources_version = resources_version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let prefs = Preferences::load(&paths).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(!prefs.embargo_unlocked);
    }

    #[test]
    fn test_versions_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("nested"));

        let mut prefs = Preferences::default();
        prefs.set_versions(3, 1_472_093_065_000);
        prefs.embargo_unlocked = true;
        prefs.save(&paths).unwrap();

        let loaded = Preferences::load(&paths).unwrap();
        assert_eq!(loaded.database_version, 3);
        assert_eq!(loaded.resources_version, 1_472_093_065_000);
        assert!(loaded.embargo_unlocked);
    }
}
