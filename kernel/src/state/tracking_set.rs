// Tracking Set
//
// The fixed statement-category vocabulary and the ordered set of
// categories a version records.

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::log::LogKind;

/// A statement category that can be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementCategory {
    AlterTable,
    RenameTable,
    CreateTable,
    DropTable,
    AlterView,
    CreateView,
    DropView,
    CreateIndex,
    DropIndex,
    Insert,
    Update,
    Delete,
    Truncate,
    Replace,
}

use StatementCategory::*;

/// Every category in display and persistence order, with its flag name and label.
pub const CATEGORIES: [(StatementCategory, &str, &str); 14] = [
    (AlterTable, "alter_table", "ALTER TABLE"),
    (RenameTable, "rename_table", "RENAME TABLE"),
    (CreateTable, "create_table", "CREATE TABLE"),
    (DropTable, "drop_table", "DROP TABLE"),
    (AlterView, "alter_view", "ALTER VIEW"),
    (CreateView, "create_view", "CREATE VIEW"),
    (DropView, "drop_view", "DROP VIEW"),
    (CreateIndex, "create_index", "CREATE INDEX"),
    (DropIndex, "drop_index", "DROP INDEX"),
    (Insert, "insert", "INSERT"),
    (Update, "update", "UPDATE"),
    (Delete, "delete", "DELETE"),
    (Truncate, "truncate", "TRUNCATE"),
    (Replace, "replace", "REPLACE"),
];

impl StatementCategory {
    pub fn label(&self) -> &'static str {
        CATEGORIES
            .iter()
            .find(|(c, _, _)| c == self)
            .map(|(_, _, label)| *label)
            .unwrap_or_default()
    }

    pub fn flag(&self) -> &'static str {
        CATEGORIES
            .iter()
            .find(|(c, _, _)| c == self)
            .map(|(_, flag, _)| *flag)
            .unwrap_or_default()
    }

    pub fn from_label(label: &str) -> Option<Self> {
        CATEGORIES
            .iter()
            .find(|(_, _, l)| l.eq_ignore_ascii_case(label))
            .map(|(c, _, _)| *c)
    }

    /// Log a statement of this category is recorded in.
    pub fn log_kind(&self) -> LogKind {
        match self {
            Insert | Update | Delete | Truncate | Replace => LogKind::Dml,
            _ => LogKind::Ddl,
        }
    }

    /// Classify a SQL statement by its leading keywords.
    pub fn classify(statement: &str) -> Option<Self> {
        let words: Vec<String> = statement
            .split_whitespace()
            .take(6)
            .map(|w| w.to_ascii_uppercase())
            .collect();
        let word = |i: usize| words.get(i).map(String::as_str).unwrap_or("");

        match word(0) {
            "INSERT" => Some(Insert),
            "UPDATE" => Some(Update),
            "DELETE" => Some(Delete),
            "TRUNCATE" => Some(Truncate),
            "REPLACE" => Some(Replace),
            "RENAME" if word(1) == "TABLE" => Some(RenameTable),
            "ALTER" => match word(1) {
                "TABLE" | "ONLINE" | "IGNORE" => Some(AlterTable),
                "VIEW" => Some(AlterView),
                _ if words.iter().any(|w| w == "VIEW") => Some(AlterView),
                _ => None,
            },
            "CREATE" => {
                // Skip modifiers such as TEMPORARY, UNIQUE or OR REPLACE.
                let object = words[1..]
                    .iter()
                    .find(|w| matches!(w.as_str(), "TABLE" | "VIEW" | "INDEX"));
                match object.map(String::as_str) {
                    Some("TABLE") => Some(CreateTable),
                    Some("VIEW") => Some(CreateView),
                    Some("INDEX") => Some(CreateIndex),
                    _ => None,
                }
            }
            "DROP" => match word(1) {
                "TABLE" | "TEMPORARY" => Some(DropTable),
                "VIEW" => Some(DropView),
                "INDEX" => Some(DropIndex),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Insertion-ordered set of tracked categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingSet {
    categories: Vec<StatementCategory>,
}

impl TrackingSet {
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// All fourteen categories in enumeration order.
    pub fn all() -> Self {
        Self {
            categories: CATEGORIES.iter().map(|(c, _, _)| *c).collect(),
        }
    }

    /// Add a category; duplicates keep their first position.
    pub fn insert(&mut self, category: StatementCategory) {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
    }

    pub fn contains(&self, category: StatementCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatementCategory> {
        self.categories.iter()
    }

    /// Comma-joined labels, no trailing separator.
    pub fn to_comma_string(&self) -> String {
        self.categories
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse a comma-joined label list, keeping its order.
    pub fn parse(text: &str) -> Result<Self, TrackingError> {
        let mut set = Self::new();
        for label in text.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            let category = StatementCategory::from_label(label).ok_or_else(|| {
                TrackingError::MalformedInput(format!("unknown statement category `{label}`"))
            })?;
            set.insert(category);
        }
        Ok(set)
    }
}

impl FromIterator<StatementCategory> for TrackingSet {
    fn from_iter<I: IntoIterator<Item = StatementCategory>>(iter: I) -> Self {
        let mut set = Self::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

/// Build the persisted tracking-set string from a flag selection.
///
/// Flags are visited in enumeration order regardless of how the
/// caller ordered them. An unknown flag name is rejected.
pub fn build_tracking_set<S: AsRef<str>>(selected_flags: &[S]) -> Result<String, TrackingError> {
    if let Some(unknown) = selected_flags
        .iter()
        .map(AsRef::as_ref)
        .find(|f| !CATEGORIES.iter().any(|(_, flag, _)| flag == f))
    {
        return Err(TrackingError::MalformedInput(format!(
            "unknown statement flag `{unknown}`"
        )));
    }

    let mut out = String::new();
    for (_, flag, label) in CATEGORIES.iter() {
        if selected_flags.iter().any(|f| f.as_ref() == *flag) {
            out.push_str(label);
            out.push(',');
        }
    }
    if out.ends_with(',') {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_string_in_enumeration_order() {
        assert_eq!(
            build_tracking_set(&["insert", "alter_table"]).unwrap(),
            "ALTER TABLE,INSERT"
        );
        assert_eq!(build_tracking_set::<&str>(&[]).unwrap(), "");
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(matches!(
            build_tracking_set(&["inserts"]),
            Err(TrackingError::MalformedInput(_))
        ));
        assert!(build_tracking_set(&["truncate", "bogus"]).is_err());
    }

    #[test]
    fn parse_preserves_order() {
        let set = TrackingSet::parse("INSERT,ALTER TABLE,DROP VIEW").unwrap();

        assert_eq!(set.to_comma_string(), "INSERT,ALTER TABLE,DROP VIEW");
        assert!(set.contains(AlterTable));
        assert!(!set.contains(Update));
    }

    #[test]
    fn parse_rejects_unknown_label() {
        let err = TrackingSet::parse("INSERT,SELECT").unwrap_err();
        assert!(matches!(err, TrackingError::MalformedInput(_)));
    }

    #[test]
    fn all_has_fourteen_categories() {
        let all = TrackingSet::all();
        assert_eq!(all.iter().count(), 14);
        assert!(all.to_comma_string().starts_with("ALTER TABLE,RENAME TABLE"));
        assert!(!all.to_comma_string().ends_with(','));
    }

    #[test]
    fn classify_statements() {
        assert_eq!(StatementCategory::classify("insert into t values (1)"), Some(Insert));
        assert_eq!(
            StatementCategory::classify("CREATE UNIQUE INDEX i ON t (a)"),
            Some(CreateIndex)
        );
        assert_eq!(
            StatementCategory::classify("CREATE OR REPLACE VIEW v AS SELECT 1"),
            Some(CreateView)
        );
        assert_eq!(
            StatementCategory::classify("  ALTER\n TABLE t ADD c INT"),
            Some(AlterTable)
        );
        assert_eq!(StatementCategory::classify("RENAME TABLE a TO b"), Some(RenameTable));
        assert_eq!(StatementCategory::classify("SELECT * FROM t"), None);
        assert_eq!(StatementCategory::classify(""), None);
    }

    #[test]
    fn categories_know_their_log() {
        assert_eq!(Insert.log_kind(), LogKind::Dml);
        assert_eq!(DropIndex.log_kind(), LogKind::Ddl);
        assert_eq!(Replace.flag(), "replace");
    }
}
