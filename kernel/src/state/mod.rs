// Tracked Versions
//
// A version groups the two statement logs of a table with the
// tracking set and structural snapshot captured when it was created.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::log::{LogKind, StatementLog};

pub mod snapshot;
pub mod tracking_set;

pub use snapshot::StructuralSnapshot;
pub use tracking_set::{build_tracking_set, StatementCategory, TrackingSet};

/// Caller-assigned version number of a table.
pub type Version = u64;

/// One tracked version of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedVersion {
    pub db: String,
    pub table: String,
    pub version: Version,
    pub tracking_set: TrackingSet,
    pub is_view: bool,
    pub active: bool,
    pub date_created: String,
    pub ddlog: StatementLog,
    pub dmlog: StatementLog,
    pub snapshot: StructuralSnapshot,
}

impl TrackedVersion {
    pub fn log(&self, kind: LogKind) -> &StatementLog {
        match kind {
            LogKind::Ddl => &self.ddlog,
            LogKind::Dml => &self.dmlog,
        }
    }

    pub fn log_mut(&mut self, kind: LogKind) -> &mut StatementLog {
        match kind {
            LogKind::Ddl => &mut self.ddlog,
            LogKind::Dml => &mut self.dmlog,
        }
    }

    /// Earliest and latest parsable entry timestamps across both logs.
    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut stamps = self
            .ddlog
            .iter()
            .chain(self.dmlog.iter())
            .filter_map(|e| e.timestamp());
        let first = stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    /// Convert into the persisted row layout.
    pub fn to_row(&self) -> Result<VersionRow, TrackingError> {
        let schema_snapshot = self
            .snapshot
            .encode()
            .map_err(|e| TrackingError::MalformedInput(e.to_string()))?;

        Ok(VersionRow {
            db_name: self.db.clone(),
            table_name: self.table.clone(),
            version: self.version,
            tracking: self.tracking_set.to_comma_string(),
            schema_snapshot,
            ddlog: encode_log(&self.ddlog)?,
            dmlog: encode_log(&self.dmlog)?,
            is_view: self.is_view,
            active: self.active,
            date_created: self.date_created.clone(),
        })
    }

    /// Rebuild from a persisted row. A bad snapshot blob decodes as empty.
    pub fn from_row(row: &VersionRow) -> Result<Self, TrackingError> {
        Ok(Self {
            db: row.db_name.clone(),
            table: row.table_name.clone(),
            version: row.version,
            tracking_set: TrackingSet::parse(&row.tracking)?,
            is_view: row.is_view,
            active: row.active,
            date_created: row.date_created.clone(),
            ddlog: decode_log(&row.ddlog)?,
            dmlog: decode_log(&row.dmlog)?,
            snapshot: StructuralSnapshot::decode(&row.schema_snapshot),
        })
    }
}

fn encode_log(log: &StatementLog) -> Result<String, TrackingError> {
    log.encode()
        .map_err(|e| TrackingError::MalformedInput(format!("log encode failed: {e}")))
}

fn decode_log(text: &str) -> Result<StatementLog, TrackingError> {
    StatementLog::decode(text)
        .map_err(|e| TrackingError::MalformedInput(format!("log decode failed: {e}")))
}

/// Persisted layout of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRow {
    pub db_name: String,
    pub table_name: String,
    pub version: Version,
    pub tracking: String,
    pub schema_snapshot: String,
    pub ddlog: String,
    pub dmlog: String,
    #[serde(default)]
    pub is_view: bool,
    pub active: bool,
    pub date_created: String,
}

impl VersionRow {
    /// Replace the log column selected by `kind`.
    pub fn set_log(&mut self, kind: LogKind, log: &StatementLog) -> Result<(), TrackingError> {
        let encoded = encode_log(log)?;
        match kind {
            LogKind::Ddl => self.ddlog = encoded,
            LogKind::Dml => self.dmlog = encoded,
        }
        Ok(())
    }

    /// Decode the log column selected by `kind`.
    pub fn log(&self, kind: LogKind) -> Result<StatementLog, TrackingError> {
        match kind {
            LogKind::Ddl => decode_log(&self.ddlog),
            LogKind::Dml => decode_log(&self.dmlog),
        }
    }

    pub fn matches(&self, db: &str, table: &str) -> bool {
        self.db_name == db && self.table_name == table
    }
}
