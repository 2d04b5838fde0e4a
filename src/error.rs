// Error taxonomy for the graph engine

use thiserror::Error;

/// Errors raised by ingestion, storage and linkage.
///
/// Only [`TkgError::StoreUnavailable`] is fatal to an ingestion run. Everything
/// else is scoped to a single file or commit and is logged and skipped by the
/// pipeline, or surfaced directly to the caller of a one-shot operation.
#[derive(Error, Debug)]
pub enum TkgError {
    #[error("Failed to parse {path}: {reason}")]
    ParseFailure { path: String, reason: String },

    #[error("VCS command timed out after {secs}s: {command}")]
    VcsTimeout { command: String, secs: u64 },

    #[error("VCS command failed: {0}")]
    VcsCommandFailure(String),

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("No version found for element {0}")]
    NoVersionFound(String),

    #[error("Decision not found: {0}")]
    DecisionNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Version of element {element_id} at {commit_hash} is older than an already recorded version")]
    OutOfOrderVersion {
        element_id: String,
        commit_hash: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Storage error: {0}")]
    Store(#[source] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TkgError {
    /// Whether the error must abort an ingestion run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TkgError::StoreUnavailable(_))
    }
}

impl From<rusqlite::Error> for TkgError {
    fn from(err: rusqlite::Error) -> Self {
        if store_lost(&err) {
            TkgError::StoreUnavailable(err.to_string())
        } else {
            TkgError::Store(err)
        }
    }
}

/// SQLite failures after which no further write can succeed
fn store_lost(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;

    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::DiskFull
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::OutOfMemory
        ),
        _ => false,
    }
}

impl From<r2d2::Error> for TkgError {
    fn from(err: r2d2::Error) -> Self {
        TkgError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TkgError>;
