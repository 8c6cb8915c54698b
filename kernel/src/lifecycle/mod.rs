// Version Lifecycle
//
// Creates, activates, deactivates and deletes tracked versions, and
// records statements into the active HEAD version of a table.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::catalog::{flatten_tables, Catalog, TableDescription};
use crate::config::TrackingConfig;
use crate::error::{TrackingError, TrackingResult};
use crate::log::{LogEntry, LogKind, StatementLog, TrackingStore, DATE_FORMAT};
use crate::state::{StatementCategory, StructuralSnapshot, TrackedVersion, TrackingSet, Version};

/// Parameters of a version to create.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub db: String,
    pub table: String,
    pub version: Version,
    pub tracking_set: TrackingSet,
    pub is_view: bool,
    pub username: String,
    pub created_at: NaiveDateTime,
}

/// Per-table result of a batch create.
#[derive(Debug)]
pub struct TableOutcome {
    pub table: String,
    pub result: TrackingResult<()>,
}

/// What happened to a statement offered for recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recorded {
    Appended { version: Version, kind: LogKind },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownCategory,
    NotTracked,
    Inactive,
    CategoryNotTracked,
}

/// Manages versions of tracked tables.
pub struct VersionManager<S, C> {
    store: S,
    catalog: C,
    config: TrackingConfig,
}

impl<S: TrackingStore, C: Catalog> VersionManager<S, C> {
    pub fn new(store: S, catalog: C, config: TrackingConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn ensure_enabled(&self) -> TrackingResult<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(TrackingError::NotConfigured)
        }
    }

    /// Create a version, seeding its schema log from the catalog.
    ///
    /// Nothing is rolled back if the write fails; re-read to learn the state.
    pub fn create_version(&mut self, request: NewVersion) -> TrackingResult<()> {
        self.ensure_enabled()?;
        let description = self.catalog.describe(&request.db, &request.table)?;
        self.create_described(request, description)
    }

    fn create_described(
        &mut self,
        request: NewVersion,
        description: TableDescription,
    ) -> TrackingResult<()> {
        let date = request.created_at.format(DATE_FORMAT).to_string();

        let mut ddlog = StatementLog::new();
        if request.is_view && self.config.add_drop_view {
            ddlog.push(LogEntry::new(
                date.clone(),
                request.username.clone(),
                &format!("DROP VIEW IF EXISTS `{}`;", request.table),
            ));
        } else if !request.is_view && self.config.add_drop_table {
            ddlog.push(LogEntry::new(
                date.clone(),
                request.username.clone(),
                &format!("DROP TABLE IF EXISTS `{}`;", request.table),
            ));
        }
        ddlog.push(LogEntry::new(
            date.clone(),
            request.username.clone(),
            &format!("{};", description.create_statement.trim_end().trim_end_matches(';')),
        ));

        let version = TrackedVersion {
            db: request.db,
            table: request.table,
            version: request.version,
            tracking_set: request.tracking_set,
            is_view: request.is_view,
            active: true,
            date_created: date,
            ddlog,
            dmlog: StatementLog::new(),
            snapshot: StructuralSnapshot::new(description.columns, description.indexes),
        };

        if let Err(err) = self.store.insert_version(&version) {
            tracing::warn!(
                db = %version.db,
                table = %version.table,
                version = version.version,
                error = %err,
                "failed to create version"
            );
            return Err(err.into());
        }
        tracing::info!(
            db = %version.db,
            table = %version.table,
            version = version.version,
            tracking = %version.tracking_set.to_comma_string(),
            "created tracking version"
        );
        Ok(())
    }

    /// Create the same version for several tables, attempting every one.
    pub fn create_versions_for_tables(
        &mut self,
        db: &str,
        tables: &[String],
        version: Version,
        tracking_set: &TrackingSet,
        username: &str,
        created_at: NaiveDateTime,
    ) -> Vec<TableOutcome> {
        tables
            .iter()
            .map(|table| {
                let result = self
                    .ensure_enabled()
                    .and_then(|()| self.catalog.describe(db, table).map_err(TrackingError::from))
                    .and_then(|description| {
                        let is_view = description.is_view;
                        self.create_described(
                            NewVersion {
                                db: db.to_string(),
                                table: table.clone(),
                                version,
                                tracking_set: tracking_set.clone(),
                                is_view,
                                username: username.to_string(),
                                created_at,
                            },
                            description,
                        )
                    });
                TableOutcome {
                    table: table.clone(),
                    result,
                }
            })
            .collect()
    }

    pub fn activate(&mut self, db: &str, table: &str, version: Version) -> TrackingResult<()> {
        self.set_active(db, table, version, true)
    }

    pub fn deactivate(&mut self, db: &str, table: &str, version: Version) -> TrackingResult<()> {
        self.set_active(db, table, version, false)
    }

    fn set_active(
        &mut self,
        db: &str,
        table: &str,
        version: Version,
        active: bool,
    ) -> TrackingResult<()> {
        self.ensure_enabled()?;
        self.store.set_active(db, table, version, active)?;
        tracing::info!(db, table, version, active, "changed tracking state");
        Ok(())
    }

    /// Hard-delete a version with both logs and its snapshot.
    pub fn delete_version(&mut self, db: &str, table: &str, version: Version) -> TrackingResult<()> {
        self.ensure_enabled()?;
        self.store.delete_version(db, table, version)?;
        tracing::info!(db, table, version, "deleted tracking version");
        Ok(())
    }

    /// All versions of a table, HEAD first. Empty when tracking is disabled.
    pub fn versions(&self, db: &str, table: &str) -> TrackingResult<Vec<TrackedVersion>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        Ok(self.store.read_versions(db, table)?)
    }

    /// Version with the highest number.
    pub fn head(&self, db: &str, table: &str) -> TrackingResult<Option<TrackedVersion>> {
        Ok(self.versions(db, table)?.into_iter().next())
    }

    pub fn version(&self, db: &str, table: &str, version: Version) -> TrackingResult<TrackedVersion> {
        self.versions(db, table)?
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| TrackingError::VersionNotFound {
                db: db.to_string(),
                table: table.to_string(),
                version,
            })
    }

    /// Catalog tables of `db` without any version, in catalog order.
    pub fn untracked_tables(&self, db: &str) -> TrackingResult<Vec<String>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        let tracked = self.store.tracked_tables(db)?;
        let all = flatten_tables(&self.catalog.tables(db)?);
        Ok(all.into_iter().filter(|t| !tracked.contains(t)).collect())
    }

    /// Offer an executed statement for recording into the HEAD version.
    pub fn record(
        &mut self,
        db: &str,
        table: &str,
        username: &str,
        statement: &str,
        at: NaiveDateTime,
    ) -> TrackingResult<Recorded> {
        self.ensure_enabled()?;
        let skipped = |reason| Ok(Recorded::Skipped { reason });

        let Some(category) = StatementCategory::classify(statement) else {
            return skipped(SkipReason::UnknownCategory);
        };
        let Some(head) = self.head(db, table)? else {
            return skipped(SkipReason::NotTracked);
        };
        if !head.active {
            return skipped(SkipReason::Inactive);
        }
        if !head.tracking_set.contains(category) {
            return skipped(SkipReason::CategoryNotTracked);
        }

        let kind = category.log_kind();
        let entry = LogEntry::at(at, username, statement);
        self.store
            .append_entry(db, table, head.version, kind, &entry)?;
        tracing::debug!(db, table, version = head.version, log = kind.marker(), "recorded statement");
        Ok(Recorded::Appended {
            version: head.version,
            kind,
        })
    }
}
