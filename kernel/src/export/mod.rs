// Report Export
//
// Projects an ordered report into one of three artifacts: a replay
// script, direct execution against a live connection, or a file
// download that ends the request.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{TrackingError, TrackingResult};
use crate::log::DATE_FORMAT;
use crate::report::Report;

pub const SCRIPT_PREAMBLE: &str = "# You can use the following commands to create a temporary database and replay the log.\n\
# CREATE DATABASE IF NOT EXISTS tracklog_temp_db;\n\
# USE tracklog_temp_db;\n\n";

pub const DOWNLOAD_CONTENT_TYPE: &str = "text/x-sql";

/// Connection statements are executed against.
pub trait SqlConnection {
    /// Execute one statement. With `suppress_tracking` set the
    /// connection must not offer the statement for recording.
    fn execute(&mut self, statement: &str, suppress_tracking: bool) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Script,
    Execute,
    Download,
}

impl FromStr for ExportFormat {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script" | "sqldump" => Ok(ExportFormat::Script),
            "execute" => Ok(ExportFormat::Execute),
            "download" | "sqldumpfile" => Ok(ExportFormat::Download),
            other => Err(TrackingError::MalformedInput(format!(
                "unknown export format `{other}`"
            ))),
        }
    }
}

/// Output that is rendered inside the normal page flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutput {
    Script(String),
    Executed { statements: usize },
}

/// Complete response for a file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

impl DownloadResponse {
    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }
}

/// Result of an export. A `TerminalResponse` must be sent as-is and
/// nothing else may be rendered after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    ContinuePage(PageOutput),
    TerminalResponse(DownloadResponse),
}

/// Replay script: fixed preamble followed by every statement in order.
pub fn export_script(report: &Report) -> String {
    let mut out = String::from(SCRIPT_PREAMBLE);
    out.extend(report.statements());
    out
}

/// Execute every statement in order, stopping at the first failure.
pub fn execute_report<C: SqlConnection>(report: &Report, conn: &mut C) -> TrackingResult<usize> {
    for (index, statement) in report.statements().enumerate() {
        if let Err(reason) = conn.execute(statement, true) {
            tracing::warn!(index, %reason, "aborted log execution");
            return Err(TrackingError::Execution {
                index,
                statement: statement.to_string(),
                reason,
            });
        }
    }
    tracing::info!(executed = report.entries.len(), "executed tracking log");
    Ok(report.entries.len())
}

/// Downloadable dump with a header naming the table and generation time.
pub fn export_download(report: &Report, table: &str, generated_at: NaiveDateTime) -> DownloadResponse {
    let mut dump = format!(
        "# Tracking report for table `{}`\n# {}\n",
        table,
        generated_at.format(DATE_FORMAT)
    );
    dump.extend(report.statements());

    DownloadResponse {
        bytes: dump.into_bytes(),
        content_type: DOWNLOAD_CONTENT_TYPE,
        filename: format!("log_{table}.sql"),
    }
}

/// Dispatch a report to the requested projection.
pub fn export<C: SqlConnection>(
    report: &Report,
    format: ExportFormat,
    table: &str,
    conn: &mut C,
    generated_at: NaiveDateTime,
) -> TrackingResult<ExportOutcome> {
    Ok(match format {
        ExportFormat::Script => ExportOutcome::ContinuePage(PageOutput::Script(export_script(report))),
        ExportFormat::Execute => ExportOutcome::ContinuePage(PageOutput::Executed {
            statements: execute_report(report, conn)?,
        }),
        ExportFormat::Download => {
            ExportOutcome::TerminalResponse(export_download(report, table, generated_at))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogEntry;
    use crate::report::{build_report, LogType, ReportWindow, UserFilter};
    use crate::state::tests::version;

    #[derive(Default)]
    struct RecordingConnection {
        executed: Vec<(String, bool)>,
        fail_on: Option<usize>,
    }

    impl SqlConnection for RecordingConnection {
        fn execute(&mut self, statement: &str, suppress_tracking: bool) -> Result<(), String> {
            if self.fail_on == Some(self.executed.len()) {
                return Err("table doesn't exist".into());
            }
            self.executed.push((statement.to_string(), suppress_tracking));
            Ok(())
        }
    }

    fn report() -> Report {
        let mut v = version("shop", "t", 1);
        v.ddlog.push(LogEntry::new("2024-03-01 10:00:00", "root", "CREATE TABLE t (id INT);"));
        v.dmlog.push(LogEntry::new("2024-03-01 10:00:01", "root", "INSERT INTO t VALUES (1);"));
        v.dmlog.push(LogEntry::new("2024-03-01 10:00:02", "root", "INSERT INTO t VALUES (2);"));
        let window = ReportWindow::parse("2024-01-01 00:00:00", "2024-12-31 00:00:00").unwrap();
        build_report(&v, LogType::SchemaAndData, &window, &UserFilter::any())
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-04-01 08:30:00", DATE_FORMAT).unwrap()
    }

    #[test]
    fn script_is_preamble_plus_statements() {
        let script = export_script(&report());

        assert_eq!(
            script,
            format!(
                "{SCRIPT_PREAMBLE}CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1);\nINSERT INTO t VALUES (2);\n"
            )
        );
    }

    #[test]
    fn execution_suppresses_tracking() {
        let mut conn = RecordingConnection::default();
        let outcome = export(&report(), ExportFormat::Execute, "t", &mut conn, generated_at()).unwrap();

        assert_eq!(outcome, ExportOutcome::ContinuePage(PageOutput::Executed { statements: 3 }));
        assert_eq!(conn.executed.len(), 3);
        assert!(conn.executed.iter().all(|(_, suppressed)| *suppressed));
        assert_eq!(conn.executed[0].0, "CREATE TABLE t (id INT);\n");
    }

    #[test]
    fn execution_aborts_on_first_failure() {
        let mut conn = RecordingConnection {
            fail_on: Some(1),
            ..Default::default()
        };

        let err = execute_report(&report(), &mut conn).unwrap_err();

        match err {
            TrackingError::Execution { index, statement, .. } => {
                assert_eq!(index, 1);
                assert_eq!(statement, "INSERT INTO t VALUES (1);\n");
                assert_eq!(conn.executed.len(), index);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn download_is_terminal() {
        let mut conn = RecordingConnection::default();
        let outcome = export(&report(), ExportFormat::Download, "t", &mut conn, generated_at()).unwrap();

        let ExportOutcome::TerminalResponse(download) = outcome else {
            panic!("download must end the request");
        };
        let text = String::from_utf8(download.bytes.clone()).unwrap();
        assert!(text.starts_with("# Tracking report for table `t`\n# 2024-04-01 08:30:00\nCREATE TABLE t"));
        assert_eq!(download.content_type, "text/x-sql");
        assert_eq!(download.filename, "log_t.sql");
        assert_eq!(download.content_length(), text.len());
        assert!(conn.executed.is_empty());
    }

    #[test]
    fn format_names() {
        assert_eq!("sqldumpfile".parse::<ExportFormat>().unwrap(), ExportFormat::Download);
        assert!("csv".parse::<ExportFormat>().is_err());
    }
}
