// Log Filter
//
// Selects the entries of one log that fall inside a time window and
// were written by an allowed user. Pure; never mutates its input.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::TrackingError;
use crate::log::{LogEntry, LogKind, StatementLog, DATE_FORMAT};

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl ReportWindow {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self { from, to }
    }

    /// Parse both bounds in the stored entry date format.
    pub fn parse(from: &str, to: &str) -> Result<Self, TrackingError> {
        let parse = |s: &str| {
            NaiveDateTime::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|e| TrackingError::MalformedInput(format!("invalid date `{s}`: {e}")))
        };
        Ok(Self::new(parse(from)?, parse(to)?))
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Users whose entries a report shows. `*` admits everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    users: BTreeSet<String>,
}

impl UserFilter {
    pub const WILDCARD: &'static str = "*";

    pub fn any() -> Self {
        Self::from_names([Self::WILDCARD])
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated user list. Blank names are dropped.
    pub fn parse(list: &str) -> Self {
        Self::from_names(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn allows(&self, username: &str) -> bool {
        self.users.contains(Self::WILDCARD) || self.users.contains(username)
    }
}

/// An entry selected for a report.
///
/// `id` is the entry's position in its unfiltered log at read time,
/// and is the key a later delete targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub id: usize,
    pub kind: LogKind,
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub entry: LogEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredLog {
    pub entries: Vec<ReportEntry>,
    /// Entries skipped because their stored date did not parse.
    pub parse_errors: usize,
}

/// Filter one log. Output keeps the input's relative order.
pub fn filter_log(
    log: &StatementLog,
    kind: LogKind,
    window: &ReportWindow,
    users: &UserFilter,
) -> FilteredLog {
    let mut out = FilteredLog::default();

    for (id, entry) in log.iter().enumerate() {
        let Some(timestamp) = entry.timestamp() else {
            out.parse_errors += 1;
            continue;
        };
        if window.contains(timestamp) && users.allows(&entry.username) {
            out.entries.push(ReportEntry {
                id,
                kind,
                timestamp,
                entry: entry.clone(),
            });
        }
    }

    if out.parse_errors > 0 {
        tracing::debug!(
            log = kind.marker(),
            parse_errors = out.parse_errors,
            "skipped entries with unparsable dates"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn whole_day() -> ReportWindow {
        ReportWindow::new(at("2024-03-01 00:00:00"), at("2024-03-01 23:59:59"))
    }

    #[test]
    fn ids_come_from_unfiltered_positions() {
        let log = StatementLog::from(vec![
            LogEntry::new("2024-03-01 00:01:40", "bob", "S1;"),
            LogEntry::new("2024-03-01 00:00:50", "alice", "S2;"),
        ]);

        let filtered = filter_log(&log, LogKind::Dml, &whole_day(), &UserFilter::parse("alice"));

        assert_eq!(filtered.entries.len(), 1);
        assert_eq!(filtered.entries[0].id, 1);
        assert_eq!(filtered.entries[0].entry.username, "alice");
        assert_eq!(filtered.entries[0].entry.statement, "S2;\n");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let log = StatementLog::from(vec![
            LogEntry::new("2024-02-29 23:59:59", "a", "before;"),
            LogEntry::new("2024-03-01 00:00:00", "a", "first;"),
            LogEntry::new("2024-03-01 23:59:59", "a", "last;"),
            LogEntry::new("2024-03-02 00:00:00", "a", "after;"),
        ]);

        let filtered = filter_log(&log, LogKind::Ddl, &whole_day(), &UserFilter::any());
        let ids: Vec<_> = filtered.entries.iter().map(|e| e.id).collect();

        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn unparsable_dates_are_counted() {
        let log = StatementLog::from(vec![
            LogEntry::new("yesterday", "a", "S0;"),
            LogEntry::new("2024-03-01 12:00:00", "a", "S1;"),
            LogEntry::new("2024-13-01 12:00:00", "a", "S2;"),
        ]);

        let filtered = filter_log(&log, LogKind::Ddl, &whole_day(), &UserFilter::any());

        assert_eq!(filtered.parse_errors, 2);
        assert_eq!(filtered.entries.len(), 1);
        assert_eq!(filtered.entries[0].id, 1);
    }

    #[test]
    fn user_list_parsing() {
        let users = UserFilter::parse(" alice, ,bob ");

        assert!(users.allows("alice"));
        assert!(users.allows("bob"));
        assert!(!users.allows("carol"));
        assert!(UserFilter::parse("bob,*").allows("carol"));
        assert!(!UserFilter::parse("").allows("carol"));
    }

    #[test]
    fn window_parse_rejects_bad_dates() {
        assert!(ReportWindow::parse("2024-03-01 00:00:00", "2024-03-02 00:00:00").is_ok());
        assert!(matches!(
            ReportWindow::parse("2024-03-01", "2024-03-02 00:00:00"),
            Err(TrackingError::MalformedInput(_))
        ));
    }
}
