//! Hooks that rewrite query text before it reaches the store.

use playa_config_and_utils::Preferences;
use playa_database::{Table, LOCATION_COLUMNS};

/// Rewrites a query before every run.
///
/// Implementations must be pure: the same text and tables always give the
/// same output, since a live query calls this again on each re-run.
pub trait QueryInterceptor: Send + Sync {
    fn intercept(&self, sql: &str, tables: &[Table]) -> String;
}

/// Leaves every query untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl QueryInterceptor for Identity {
    fn intercept(&self, sql: &str, _tables: &[Table]) -> String {
        sql.to_string()
    }
}

const EMBARGOED_LOCATION: &str = "NULL AS latitude, NULL AS longitude";

/// Hides the published locations of art, camps and events until the
/// location embargo is lifted. User points of interest are never hidden.
#[derive(Debug, Clone, Copy)]
pub struct Embargo {
    active: bool,
}

impl Embargo {
    pub fn new(unlocked: bool) -> Self {
        Self { active: !unlocked }
    }

    pub fn from_preferences(preferences: &Preferences) -> Self {
        Self::new(preferences.embargo_unlocked)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl QueryInterceptor for Embargo {
    fn intercept(&self, sql: &str, tables: &[Table]) -> String {
        let embargoed = tables.iter().any(|table| *table != Table::UserPoi);
        if self.active && embargoed {
            sql.replacen(LOCATION_COLUMNS, EMBARGOED_LOCATION, 1)
        } else {
            sql.to_string()
        }
    }
}
