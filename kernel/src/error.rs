// Tracking Errors
//
// Kernel boundary error type plus the stable message identifiers
// that UI callers render. Every failure carries both a
// machine-checkable status and a message key.

use serde::Serialize;

use crate::catalog::CatalogError;
use crate::log::store::StoreError;
use crate::state::Version;

/// Errors surfaced by tracking operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// Tracking is disabled in the configuration.
    #[error("tracking is not configured")]
    NotConfigured,

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Caller supplied an id, date or label that does not validate.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("version {version} of `{db}`.`{table}` not found")]
    VersionNotFound {
        db: String,
        table: String,
        version: Version,
    },

    /// A statement failed during direct execution. The `index`
    /// statements before it ran; nothing after it did.
    #[error("statement {index} failed: {reason}")]
    Execution {
        index: usize,
        statement: String,
        reason: String,
    },
}

pub type TrackingResult<T> = Result<T, TrackingError>;

impl TrackingError {
    pub fn message_key(&self) -> MessageKey {
        match self {
            TrackingError::NotConfigured => MessageKey::TrackingNotConfigured,
            TrackingError::Persistence(_) => MessageKey::PersistenceFailed,
            TrackingError::MalformedInput(_) => MessageKey::MalformedInput,
            TrackingError::Catalog(_) => MessageKey::CatalogUnavailable,
            TrackingError::VersionNotFound { .. } => MessageKey::VersionNotFound,
            TrackingError::Execution { .. } => MessageKey::ExecutionAborted,
        }
    }
}

/// Stable identifiers for user-visible messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    VersionCreated,
    VersionActivated,
    VersionDeactivated,
    VersionDeleted,
    EntryDeleted,
    StatementsExecuted,
    TrackingNotConfigured,
    PersistenceFailed,
    MalformedInput,
    CatalogUnavailable,
    VersionNotFound,
    ExecutionAborted,
}

impl MessageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::VersionCreated => "version_created",
            MessageKey::VersionActivated => "version_activated",
            MessageKey::VersionDeactivated => "version_deactivated",
            MessageKey::VersionDeleted => "version_deleted",
            MessageKey::EntryDeleted => "entry_deleted",
            MessageKey::StatementsExecuted => "statements_executed",
            MessageKey::TrackingNotConfigured => "tracking_not_configured",
            MessageKey::PersistenceFailed => "persistence_failed",
            MessageKey::MalformedInput => "malformed_input",
            MessageKey::CatalogUnavailable => "catalog_unavailable",
            MessageKey::VersionNotFound => "version_not_found",
            MessageKey::ExecutionAborted => "execution_aborted",
        }
    }
}

/// Status handed back to UI callers: success flag plus message key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub success: bool,
    pub key: MessageKey,
}

impl Notice {
    /// Build a notice from an operation result, using `ok` on success.
    pub fn from_result<T>(result: &TrackingResult<T>, ok: MessageKey) -> Self {
        match result {
            Ok(_) => Notice {
                success: true,
                key: ok,
            },
            Err(err) => Notice {
                success: false,
                key: err.message_key(),
            },
        }
    }
}
