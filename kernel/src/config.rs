// Tracking Configuration
//
// Feature switch plus the defaults used when versions are created.

use serde::{Deserialize, Serialize};

use crate::state::TrackingSet;

/// Tracking configuration loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// When false every read yields no data and every write fails.
    pub enabled: bool,

    /// Seed new table versions with `DROP TABLE IF EXISTS`.
    #[serde(default = "default_true")]
    pub add_drop_table: bool,

    /// Seed new view versions with `DROP VIEW IF EXISTS`.
    #[serde(default = "default_true")]
    pub add_drop_view: bool,

    /// Tracking set used when the caller does not pick one.
    #[serde(default = "TrackingSet::all")]
    pub default_statements: TrackingSet,
}

fn default_true() -> bool {
    true
}

impl TrackingConfig {
    /// Default built-in configuration (used if no config is provided).
    pub fn default_config() -> Self {
        Self {
            enabled: true,
            add_drop_table: true,
            add_drop_view: true,
            default_statements: TrackingSet::all(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default_config()
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
