use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracklog_kernel::catalog::StaticCatalog;
use tracklog_kernel::config::TrackingConfig;
use tracklog_kernel::export::{export, ExportFormat, ExportOutcome, PageOutput, SqlConnection};
use tracklog_kernel::lifecycle::{NewVersion, VersionManager};
use tracklog_kernel::log::{JsonFileStore, LogKind};
use tracklog_kernel::mutation::LogMutator;
use tracklog_kernel::report::{build_report, LogType, ReportEntry, ReportWindow, UserFilter};
use tracklog_kernel::state::{build_tracking_set, TrackedVersion, TrackingSet, Version};
use tracklog_kernel::{MessageKey, Notice, TrackingResult};

/// Tracklog change-tracking CLI
#[derive(Parser, Debug)]
#[command(name = "tracklog")]
#[command(about = "Versioned schema and data change logs for tables", long_about = None)]
struct Cli {
    /// Path to the tracking store JSON
    #[arg(long, default_value = "tracking.json")]
    store: PathBuf,

    /// Path to the catalog description JSON
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to tracking config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a version of one table
    Create {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        version: Version,
        /// Statement flags to track, e.g. alter_table,insert
        #[arg(long, value_delimiter = ',')]
        track: Vec<String>,
        #[arg(long)]
        view: bool,
        #[arg(long, default_value = "root")]
        user: String,
    },
    /// Create the same version for several tables
    CreateMany {
        #[arg(long)]
        db: String,
        #[arg(long, value_delimiter = ',', required = true)]
        tables: Vec<String>,
        #[arg(long)]
        version: Version,
        #[arg(long, value_delimiter = ',')]
        track: Vec<String>,
        #[arg(long, default_value = "root")]
        user: String,
    },
    Activate {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        version: Version,
    },
    Deactivate {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        version: Version,
    },
    DeleteVersion {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        version: Version,
    },
    /// List versions of a table, HEAD first
    Versions {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
    },
    /// List catalog tables without any version
    Untracked {
        #[arg(long)]
        db: String,
    },
    /// Offer an executed statement for recording
    Record {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long, default_value = "root")]
        user: String,
        #[arg(long)]
        sql: String,
    },
    /// Show or export the filtered log of a version
    Report {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        version: Version,
        #[arg(long, default_value = "schema_and_data")]
        log_type: LogType,
        #[arg(long, default_value = "1970-01-01 00:00:00")]
        from: String,
        #[arg(long, default_value = "9999-12-31 23:59:59")]
        to: String,
        /// Comma-separated users, `*` for everyone
        #[arg(long, default_value = "*")]
        users: String,
        #[arg(long)]
        export: Option<ExportFormat>,
        /// Where a download is written (defaults to its suggested filename)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete one entry of a version log by its report id
    DeleteEntry {
        #[arg(long)]
        db: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        version: Version,
        #[arg(long)]
        log: LogKind,
        #[arg(long)]
        id: String,
    },
}

/// Wrapper for JSON output
#[derive(Debug, Serialize)]
struct CliOutput<T: Serialize> {
    notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<T>,
}

#[derive(Debug, Serialize)]
struct VersionSummary {
    version: Version,
    active: bool,
    tracking: String,
    date_created: String,
    ddl_entries: usize,
    dml_entries: usize,
    date_from: Option<NaiveDateTime>,
    date_to: Option<NaiveDateTime>,
}

impl From<&TrackedVersion> for VersionSummary {
    fn from(v: &TrackedVersion) -> Self {
        let range = v.date_range();
        Self {
            version: v.version,
            active: v.active,
            tracking: v.tracking_set.to_comma_string(),
            date_created: v.date_created.clone(),
            ddl_entries: v.ddlog.len(),
            dml_entries: v.dmlog.len(),
            date_from: range.map(|(from, _)| from),
            date_to: range.map(|(_, to)| to),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    entries: &'a [ReportEntry],
    parse_errors: usize,
}

#[derive(Debug, Serialize)]
struct BatchResult {
    table: String,
    notice: Notice,
    error: Option<String>,
}

/// Prints statements instead of running them.
struct DryRunConnection;

impl SqlConnection for DryRunConnection {
    fn execute(&mut self, statement: &str, _suppress_tracking: bool) -> Result<(), String> {
        print!("{statement}");
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_notice<T: Serialize>(result: TrackingResult<T>, ok: MessageKey) -> Result<()> {
    let notice = Notice::from_result(&result, ok);
    if let Err(err) = &result {
        tracing::error!(error = %err, "operation failed");
    }
    print_json(&CliOutput {
        notice,
        detail: result.ok(),
    })
}

fn tracking_set(track: &[String], config: &TrackingConfig) -> Result<TrackingSet> {
    if track.is_empty() {
        return Ok(config.default_statements.clone());
    }
    Ok(TrackingSet::parse(&build_tracking_set(track)?)?)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // ----------------------------
    // Load config
    // ----------------------------
    let config = if let Some(path) = &cli.config {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str::<TrackingConfig>(&data)?
    } else {
        TrackingConfig::default_config()
    };

    // ----------------------------
    // Load catalog
    // ----------------------------
    let catalog = if let Some(path) = &cli.catalog {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        serde_json::from_str::<StaticCatalog>(&data)?
    } else {
        StaticCatalog::new()
    };

    let store = JsonFileStore::open(&cli.store)
        .with_context(|| format!("opening store {}", cli.store.display()))?;
    let mut manager = VersionManager::new(store, catalog, config);

    match cli.command {
        Command::Create {
            db,
            table,
            version,
            track,
            view,
            user,
        } => {
            let tracking_set = tracking_set(&track, manager.config())?;
            let result = manager.create_version(NewVersion {
                db,
                table,
                version,
                tracking_set,
                is_view: view,
                username: user,
                created_at: now(),
            });
            print_notice(result, MessageKey::VersionCreated)
        }
        Command::CreateMany {
            db,
            tables,
            version,
            track,
            user,
        } => {
            let tracking_set = tracking_set(&track, manager.config())?;
            let outcomes =
                manager.create_versions_for_tables(&db, &tables, version, &tracking_set, &user, now());
            let results: Vec<BatchResult> = outcomes
                .into_iter()
                .map(|o| BatchResult {
                    notice: Notice::from_result(&o.result, MessageKey::VersionCreated),
                    error: o.result.err().map(|e| e.to_string()),
                    table: o.table,
                })
                .collect();
            print_json(&results)
        }
        Command::Activate { db, table, version } => print_notice(
            manager.activate(&db, &table, version),
            MessageKey::VersionActivated,
        ),
        Command::Deactivate { db, table, version } => print_notice(
            manager.deactivate(&db, &table, version),
            MessageKey::VersionDeactivated,
        ),
        Command::DeleteVersion { db, table, version } => print_notice(
            manager.delete_version(&db, &table, version),
            MessageKey::VersionDeleted,
        ),
        Command::Versions { db, table } => {
            let versions = manager.versions(&db, &table)?;
            let summaries: Vec<VersionSummary> = versions.iter().map(VersionSummary::from).collect();
            print_json(&summaries)
        }
        Command::Untracked { db } => print_json(&manager.untracked_tables(&db)?),
        Command::Record {
            db,
            table,
            user,
            sql,
        } => print_json(&manager.record(&db, &table, &user, &sql, now())?),
        Command::Report {
            db,
            table,
            version,
            log_type,
            from,
            to,
            users,
            export: format,
            out,
        } => {
            let data = manager.version(&db, &table, version)?;
            let window = ReportWindow::parse(&from, &to)?;
            let report = build_report(&data, log_type, &window, &UserFilter::parse(&users));

            let Some(format) = format else {
                return print_json(&ReportOutput {
                    entries: &report.entries,
                    parse_errors: report.parse_errors,
                });
            };

            match export(&report, format, &table, &mut DryRunConnection, now())? {
                ExportOutcome::ContinuePage(PageOutput::Script(script)) => {
                    std::io::stdout().write_all(script.as_bytes())?;
                    Ok(())
                }
                ExportOutcome::ContinuePage(executed) => print_json(&CliOutput {
                    notice: Notice {
                        success: true,
                        key: MessageKey::StatementsExecuted,
                    },
                    detail: Some(executed),
                }),
                ExportOutcome::TerminalResponse(download) => {
                    let path = out.unwrap_or_else(|| PathBuf::from(&download.filename));
                    fs::write(&path, &download.bytes)?;
                    tracing::info!(
                        path = %path.display(),
                        content_type = download.content_type,
                        bytes = download.content_length(),
                        "wrote tracking report"
                    );
                    Ok(())
                }
            }
        }
        Command::DeleteEntry {
            db,
            table,
            version,
            log,
            id,
        } => {
            let mut data = manager.version(&db, &table, version)?;
            let result = LogMutator::new(manager.store_mut()).delete_entry(&mut data, log, &id);
            print_notice(result, MessageKey::EntryDeleted)
        }
    }
}
