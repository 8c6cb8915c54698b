// In-Memory Tracking Store
//
// Keeps persisted rows in a vector. Also the row table the JSON
// file store loads into and writes back from.

use serde::{Deserialize, Serialize};

use super::store::{StoreError, TrackingStore};
use super::{LogEntry, LogKind, StatementLog};
use crate::state::{TrackedVersion, Version, VersionRow};

/// Rows of the tracking table, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct RowTable {
    rows: Vec<VersionRow>,
}

impl RowTable {
    fn find_mut(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
    ) -> Result<&mut VersionRow, StoreError> {
        self.rows
            .iter_mut()
            .find(|r| r.matches(db, table) && r.version == version)
            .ok_or_else(|| StoreError::missing(db, table, version))
    }

    pub(crate) fn read_versions(
        &self,
        db: &str,
        table: &str,
    ) -> Result<Vec<TrackedVersion>, StoreError> {
        let mut versions = self
            .rows
            .iter()
            .filter(|r| r.matches(db, table))
            .map(|r| TrackedVersion::from_row(r).map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    pub(crate) fn insert(&mut self, version: &TrackedVersion) -> Result<(), StoreError> {
        if self
            .rows
            .iter()
            .any(|r| r.matches(&version.db, &version.table) && r.version == version.version)
        {
            return Err(StoreError::Conflict {
                db: version.db.clone(),
                table: version.table.clone(),
                version: version.version,
            });
        }
        let row = version
            .to_row()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.rows.push(row);
        Ok(())
    }

    pub(crate) fn write_log(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        log: &StatementLog,
    ) -> Result<(), StoreError> {
        self.find_mut(db, table, version)?
            .set_log(kind, log)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    pub(crate) fn append_entry(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        entry: &LogEntry,
    ) -> Result<(), StoreError> {
        let row = self.find_mut(db, table, version)?;
        let mut log = row
            .log(kind)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        log.push(entry.clone());
        row.set_log(kind, &log)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    pub(crate) fn set_active(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        active: bool,
    ) -> Result<(), StoreError> {
        self.find_mut(db, table, version)?.active = active;
        Ok(())
    }

    pub(crate) fn delete(&mut self, db: &str, table: &str, version: Version) -> Result<(), StoreError> {
        let before = self.rows.len();
        self.rows
            .retain(|r| !(r.matches(db, table) && r.version == version));
        if self.rows.len() == before {
            return Err(StoreError::missing(db, table, version));
        }
        Ok(())
    }

    pub(crate) fn tracked_tables(&self, db: &str) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        for row in self.rows.iter().filter(|r| r.db_name == db) {
            if !tables.contains(&row.table_name) {
                tables.push(row.table_name.clone());
            }
        }
        tables
    }
}

/// Volatile store for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryTrackingStore {
    rows: RowTable,
}

impl InMemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackingStore for InMemoryTrackingStore {
    fn read_versions(&self, db: &str, table: &str) -> Result<Vec<TrackedVersion>, StoreError> {
        self.rows.read_versions(db, table)
    }

    fn insert_version(&mut self, version: &TrackedVersion) -> Result<(), StoreError> {
        self.rows.insert(version)
    }

    fn write_log(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        log: &StatementLog,
    ) -> Result<(), StoreError> {
        self.rows.write_log(db, table, version, kind, log)
    }

    fn append_entry(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        entry: &LogEntry,
    ) -> Result<(), StoreError> {
        self.rows.append_entry(db, table, version, kind, entry)
    }

    fn set_active(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        active: bool,
    ) -> Result<(), StoreError> {
        self.rows.set_active(db, table, version, active)
    }

    fn delete_version(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
    ) -> Result<(), StoreError> {
        self.rows.delete(db, table, version)
    }

    fn tracked_tables(&self, db: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.rows.tracked_tables(db))
    }
}
