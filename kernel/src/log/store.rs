// Tracking Storage Abstraction
//
// Defines the durability contract for tracked versions and their logs.
// Implementations may persist to disk, a database table, etc.
//
// The backend is the only serialization point between concurrent
// callers. Whole-log writes are last-writer-wins.

use super::{LogEntry, LogKind, StatementLog};
use crate::state::{TrackedVersion, Version};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("version {version} of `{db}`.`{table}` does not exist")]
    Missing {
        db: String,
        table: String,
        version: Version,
    },

    #[error("version {version} of `{db}`.`{table}` already exists")]
    Conflict {
        db: String,
        table: String,
        version: Version,
    },

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn missing(db: &str, table: &str, version: Version) -> Self {
        StoreError::Missing {
            db: db.into(),
            table: table.into(),
            version,
        }
    }
}

/// Storage backend for tracked versions.
///
/// Properties required from implementations:
/// - (db, table, version) identifies at most one stored version
/// - Log writes replace the whole selected log
/// - Entries keep append order
pub trait TrackingStore {
    /// All versions of a table, highest version number first.
    fn read_versions(&self, db: &str, table: &str) -> Result<Vec<TrackedVersion>, StoreError>;

    /// Persist a new version.
    fn insert_version(&mut self, version: &TrackedVersion) -> Result<(), StoreError>;

    /// Overwrite one log of a version.
    fn write_log(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        log: &StatementLog,
    ) -> Result<(), StoreError>;

    /// Append a single entry to one log of a version.
    fn append_entry(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        entry: &LogEntry,
    ) -> Result<(), StoreError>;

    fn set_active(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        active: bool,
    ) -> Result<(), StoreError>;

    /// Hard-delete a version with its logs and snapshot.
    fn delete_version(&mut self, db: &str, table: &str, version: Version)
        -> Result<(), StoreError>;

    /// Names of tables in `db` that have at least one version.
    fn tracked_tables(&self, db: &str) -> Result<Vec<String>, StoreError>;
}
