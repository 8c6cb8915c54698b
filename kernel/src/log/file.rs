// JSON File Store
//
// Persists the tracking table as a single JSON document. Every
// write rewrites the whole file.

use std::fs;
use std::path::{Path, PathBuf};

use super::memory::RowTable;
use super::store::{StoreError, TrackingStore};
use super::{LogEntry, LogKind, StatementLog};
use crate::state::{TrackedVersion, Version};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    rows: RowTable,
}

impl JsonFileStore {
    /// Open a store file; a missing file starts an empty table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let rows = if path.exists() {
            let data = fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                RowTable::default()
            } else {
                serde_json::from_str(&data)?
            }
        } else {
            RowTable::default()
        };
        Ok(Self { path, rows })
    }

    /// Apply a change to a copy of the rows and keep it only once the file is written.
    fn commit<F>(&mut self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut RowTable) -> Result<(), StoreError>,
    {
        let mut next = self.rows.clone();
        change(&mut next)?;
        fs::write(&self.path, serde_json::to_string_pretty(&next)?)?;
        self.rows = next;
        Ok(())
    }
}

impl TrackingStore for JsonFileStore {
    fn read_versions(&self, db: &str, table: &str) -> Result<Vec<TrackedVersion>, StoreError> {
        self.rows.read_versions(db, table)
    }

    fn insert_version(&mut self, version: &TrackedVersion) -> Result<(), StoreError> {
        self.commit(|rows| rows.insert(version))
    }

    fn write_log(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        log: &StatementLog,
    ) -> Result<(), StoreError> {
        self.commit(|rows| rows.write_log(db, table, version, kind, log))
    }

    fn append_entry(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        kind: LogKind,
        entry: &LogEntry,
    ) -> Result<(), StoreError> {
        self.commit(|rows| rows.append_entry(db, table, version, kind, entry))
    }

    fn set_active(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        active: bool,
    ) -> Result<(), StoreError> {
        self.commit(|rows| rows.set_active(db, table, version, active))
    }

    fn delete_version(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
    ) -> Result<(), StoreError> {
        self.commit(|rows| rows.delete(db, table, version))
    }

    fn tracked_tables(&self, db: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.rows.tracked_tables(db))
    }
}
