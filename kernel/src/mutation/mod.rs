// Log Mutation
//
// Deletes single entries from a version's log by positional id and
// writes the whole replacement log back.

use crate::error::{TrackingError, TrackingResult};
use crate::log::{LogEntry, LogKind, StatementLog, TrackingStore};
use crate::state::TrackedVersion;

/// Parse a delete target. Only canonical non-negative integers are accepted.
pub fn parse_entry_id(raw: &str) -> TrackingResult<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|id| id.to_string() == raw)
        .ok_or_else(|| TrackingError::MalformedInput(format!("invalid entry id `{raw}`")))
}

/// Remove entry `id` from `log`. On error the log is left untouched.
pub fn remove_entry(log: &mut StatementLog, id: usize) -> TrackingResult<LogEntry> {
    let len = log.len();
    log.remove(id).ok_or_else(|| {
        TrackingError::MalformedInput(format!("entry id {id} out of range for log of {len}"))
    })
}

/// Applies entry deletes through a store.
pub struct LogMutator<'a, S> {
    store: &'a mut S,
}

impl<'a, S: TrackingStore> LogMutator<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Delete entry `raw_id` from one log of `version`.
    ///
    /// `version` is only updated once the store accepted the new log.
    pub fn delete_entry(
        &mut self,
        version: &mut TrackedVersion,
        kind: LogKind,
        raw_id: &str,
    ) -> TrackingResult<LogEntry> {
        let id = parse_entry_id(raw_id)?;
        let mut next = version.log(kind).clone();
        let removed = remove_entry(&mut next, id)?;

        if let Err(err) = self
            .store
            .write_log(&version.db, &version.table, version.version, kind, &next)
        {
            tracing::warn!(
                db = %version.db,
                table = %version.table,
                version = version.version,
                log = kind.marker(),
                error = %err,
                "entry delete not persisted"
            );
            return Err(err.into());
        }

        *version.log_mut(kind) = next;
        tracing::info!(
            db = %version.db,
            table = %version.table,
            version = version.version,
            log = kind.marker(),
            id,
            remaining = version.log(kind).len(),
            "deleted log entry"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::store::StoreError;
    use crate::log::InMemoryTrackingStore;
    use crate::state::tests::version;
    use crate::state::{TrackedVersion, Version};

    fn tracked() -> (InMemoryTrackingStore, TrackedVersion) {
        let mut store = InMemoryTrackingStore::new();
        let mut v = version("shop", "orders", 1);
        for (i, user) in ["alice", "bob", "carol"].iter().enumerate() {
            v.dmlog.push(LogEntry::new(
                format!("2024-03-01 10:00:0{i}"),
                *user,
                &format!("INSERT INTO orders VALUES ({i});"),
            ));
        }
        store.insert_version(&v).unwrap();
        (store, v)
    }

    #[test]
    fn entry_ids_must_be_canonical() {
        assert_eq!(parse_entry_id("0").unwrap(), 0);
        assert_eq!(parse_entry_id("12").unwrap(), 12);
        for raw in ["", "-1", "01", "1.0", " 1", "x", "+1"] {
            assert!(parse_entry_id(raw).is_err(), "accepted `{raw}`");
        }
    }

    #[test]
    fn delete_shifts_and_persists() {
        let (mut store, mut v) = tracked();

        let removed = LogMutator::new(&mut store)
            .delete_entry(&mut v, LogKind::Dml, "1")
            .unwrap();
        assert_eq!(removed.username, "bob");

        let users: Vec<_> = v.dmlog.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(users, vec!["alice", "carol"]);

        let stored = store.read_versions("shop", "orders").unwrap().remove(0);
        assert_eq!(stored.dmlog, v.dmlog);
    }

    #[test]
    fn deleting_last_entry_leaves_empty_log() {
        let mut store = InMemoryTrackingStore::new();
        let mut v = version("shop", "orders", 1);
        v.ddlog.push(LogEntry::new("2024-03-01 10:00:00", "root", "CREATE TABLE orders (id INT);"));
        store.insert_version(&v).unwrap();

        LogMutator::new(&mut store)
            .delete_entry(&mut v, LogKind::Ddl, "0")
            .unwrap();

        assert!(v.ddlog.is_empty());
        assert!(store.read_versions("shop", "orders").unwrap()[0].ddlog.is_empty());
    }

    #[test]
    fn bad_ids_leave_log_unmodified() {
        let (mut store, mut v) = tracked();
        let before = v.clone();

        for raw in ["3", "abc", "-1"] {
            let err = LogMutator::new(&mut store)
                .delete_entry(&mut v, LogKind::Dml, raw)
                .unwrap_err();
            assert!(matches!(err, TrackingError::MalformedInput(_)));
        }

        assert_eq!(v, before);
        assert_eq!(store.read_versions("shop", "orders").unwrap()[0].dmlog.len(), 3);
    }

    struct RejectingStore;

    impl TrackingStore for RejectingStore {
        fn read_versions(&self, _: &str, _: &str) -> Result<Vec<TrackedVersion>, StoreError> {
            Ok(vec![])
        }
        fn insert_version(&mut self, _: &TrackedVersion) -> Result<(), StoreError> {
            Ok(())
        }
        fn write_log(
            &mut self,
            db: &str,
            table: &str,
            version: Version,
            _: LogKind,
            _: &StatementLog,
        ) -> Result<(), StoreError> {
            Err(StoreError::missing(db, table, version))
        }
        fn append_entry(
            &mut self,
            _: &str,
            _: &str,
            _: Version,
            _: LogKind,
            _: &LogEntry,
        ) -> Result<(), StoreError> {
            Ok(())
        }
        fn set_active(&mut self, _: &str, _: &str, _: Version, _: bool) -> Result<(), StoreError> {
            Ok(())
        }
        fn delete_version(&mut self, _: &str, _: &str, _: Version) -> Result<(), StoreError> {
            Ok(())
        }
        fn tracked_tables(&self, _: &str) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }
    }

    #[test]
    fn failed_write_is_not_committed() {
        let (_, mut v) = tracked();
        let mut store = RejectingStore;

        let err = LogMutator::new(&mut store)
            .delete_entry(&mut v, LogKind::Dml, "0")
            .unwrap_err();

        assert!(matches!(err, TrackingError::Persistence(_)));
        assert_eq!(v.dmlog.len(), 3);
    }
}
