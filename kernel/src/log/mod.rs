// Statement Logs
//
// The two per-version logs (ddlog, dmlog), their entries and the
// form they are persisted in.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

pub mod file;
pub mod memory;
pub mod store;

pub use file::JsonFileStore;
pub use memory::InMemoryTrackingStore;
pub use store::{StoreError, TrackingStore};

/// Format of the date string stored with every entry.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which of the two logs of a version an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Ddl,
    Dml,
}

impl LogKind {
    /// Marker the storage backend uses to pick the log column.
    pub fn marker(&self) -> &'static str {
        match self {
            LogKind::Ddl => "DDL",
            LogKind::Dml => "DML",
        }
    }
}

impl FromStr for LogKind {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ddl" | "ddlog" | "schema" => Ok(LogKind::Ddl),
            "dml" | "dmlog" | "data" => Ok(LogKind::Dml),
            _ => Err(TrackingError::MalformedInput(format!("unknown log `{s}`"))),
        }
    }
}

/// A single recorded statement.
///
/// The date is kept exactly as stored; it is only parsed when a
/// report filters on it.
///
/// Statements are normalized on construction: trailing whitespace is
/// trimmed and a single `\n` appended, so exported entries concatenate
/// one statement per line. The stored text is the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: String,
    pub username: String,
    pub statement: String,
}

impl LogEntry {
    /// Create an entry. The statement is normalized to end with a single newline.
    pub fn new(date: impl Into<String>, username: impl Into<String>, statement: &str) -> Self {
        Self {
            date: date.into(),
            username: username.into(),
            statement: format!("{}\n", statement.trim_end()),
        }
    }

    pub fn at(at: NaiveDateTime, username: impl Into<String>, statement: &str) -> Self {
        Self::new(at.format(DATE_FORMAT).to_string(), username, statement)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// Append-ordered sequence of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementLog {
    entries: Vec<LogEntry>,
}

impl StatementLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Remove the entry at position `id`; later entries shift down by one.
    pub fn remove(&mut self, id: usize) -> Option<LogEntry> {
        if id < self.entries.len() {
            Some(self.entries.remove(id))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Serialize to the persisted form: a JSON array of entries.
    ///
    /// Statement text is stored as a JSON string, so any content reads
    /// back as exactly one entry.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the persisted form. Blank text is an empty log.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(text)
    }
}

impl From<Vec<LogEntry>> for StatementLog {
    fn from(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a StatementLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode() {
        let mut log = StatementLog::new();
        log.push(LogEntry::new("2024-03-01 10:00:00", "root", "CREATE TABLE t (id INT);"));
        log.push(LogEntry::new("2024-03-01 10:05:00", "alice", "INSERT INTO t VALUES (1);"));

        let text = log.encode().unwrap();
        assert_eq!(StatementLog::decode(&text).unwrap(), log);
    }

    #[test]
    fn marker_like_text_stays_one_entry() {
        let mut log = StatementLog::new();
        log.push(LogEntry::new(
            "2024-03-01 12:00:00",
            "bob",
            "INSERT INTO notes VALUES ('see # log 2024-01-01 00:00:00 mallory\nDROP TABLE x')",
        ));

        let decoded = StatementLog::decode(&log.encode().unwrap()).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.entries()[0].username, "bob");
        assert_eq!(decoded, log);
    }

    #[test]
    fn decode_empty_text() {
        assert!(StatementLog::decode("").unwrap().is_empty());
        assert!(StatementLog::decode("   \n").unwrap().is_empty());
        assert!(StatementLog::decode("[]").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(StatementLog::decode("# log 2024-03-01 10:00:00 bob\nSELECT 1;").is_err());
    }

    #[test]
    fn normalizes_statement_ending() {
        let entry = LogEntry::new("2024-03-01 10:00:00", "bob", "UPDATE t\nSET a = 1;  \n\n");
        assert_eq!(entry.statement, "UPDATE t\nSET a = 1;\n");
    }

    #[test]
    fn stored_bad_date_survives_decode() {
        let text = r#"[{"date":"2024-03","username":"bob","statement":"SELECT 1;\n"}]"#;
        let log = StatementLog::decode(text).unwrap();

        assert_eq!(log.entries()[0].date, "2024-03");
        assert!(log.entries()[0].timestamp().is_none());
    }

    #[test]
    fn log_kind_names() {
        assert_eq!("DML".parse::<LogKind>().unwrap(), LogKind::Dml);
        assert_eq!("ddlog".parse::<LogKind>().unwrap().marker(), "DDL");
        assert!("both".parse::<LogKind>().is_err());
    }

    #[test]
    fn remove_shifts_later_entries() {
        let mut log = StatementLog::from(vec![
            LogEntry::new("2024-03-01 10:00:00", "a", "S0;"),
            LogEntry::new("2024-03-01 10:00:01", "a", "S1;"),
            LogEntry::new("2024-03-01 10:00:02", "a", "S2;"),
        ]);

        let removed = log.remove(1).unwrap();
        assert_eq!(removed.statement, "S1;\n");
        assert_eq!(log.entries()[1].statement, "S2;\n");
        assert!(log.remove(2).is_none());
    }
}
