// Tracking Report
//
// Merges the filtered schema and data logs of a version into a single
// deterministically ordered sequence.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::log::LogKind;
use crate::state::TrackedVersion;

pub mod filter;

pub use filter::{filter_log, FilteredLog, ReportEntry, ReportWindow, UserFilter};

/// Which logs a report draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    Schema,
    Data,
    SchemaAndData,
}

impl LogType {
    pub fn includes(&self, kind: LogKind) -> bool {
        matches!(
            (self, kind),
            (LogType::Schema | LogType::SchemaAndData, LogKind::Ddl)
                | (LogType::Data | LogType::SchemaAndData, LogKind::Dml)
        )
    }
}

impl FromStr for LogType {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schema" => Ok(LogType::Schema),
            "data" => Ok(LogType::Data),
            "schema_and_data" => Ok(LogType::SchemaAndData),
            other => Err(TrackingError::MalformedInput(format!(
                "unknown log type `{other}`"
            ))),
        }
    }
}

/// Ordered report over one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    pub parse_errors: usize,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.entry.statement.as_str())
    }
}

/// Filter the selected logs of `data` and sort the union by
/// `(timestamp, id, username, statement)`.
pub fn build_report(
    data: &TrackedVersion,
    log_type: LogType,
    window: &ReportWindow,
    users: &UserFilter,
) -> Report {
    let mut report = Report::default();

    for kind in [LogKind::Ddl, LogKind::Dml] {
        if !log_type.includes(kind) {
            continue;
        }
        let filtered = filter_log(data.log(kind), kind, window, users);
        report.entries.extend(filtered.entries);
        report.parse_errors += filtered.parse_errors;
    }

    report.entries.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.id.cmp(&b.id))
            .then_with(|| a.entry.username.cmp(&b.entry.username))
            .then_with(|| a.entry.statement.cmp(&b.entry.statement))
    });

    tracing::debug!(
        db = %data.db,
        table = %data.table,
        version = data.version,
        entries = report.entries.len(),
        parse_errors = report.parse_errors,
        "built tracking report"
    );
    report
}
