//! Error types for the migration engine

use cairn_core::{CoreError, ReconcileError};
use cairn_db::DbError;
use thiserror::Error;

/// Migration engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Discovery, loading, or configuration failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The log does not match the migrations on disk
    #[error(transparent)]
    Integrity(#[from] ReconcileError),

    /// X001: A `create_table` change failed
    #[error("[X001] Migration '{filename}' failed to create table '{table}'")]
    SchemaApply {
        filename: String,
        table: String,
        source: DbError,
    },

    /// X002: An `insert` row failed
    #[error("[X002] Migration '{filename}' failed to insert row {row_index} into '{table}'")]
    DataApply {
        filename: String,
        table: String,
        row_index: usize,
        source: DbError,
    },

    /// X003: The migration log could not be created, read, or appended to
    #[error("[X003] Migration log failure while {context}")]
    LogStorage { context: String, source: DbError },

    /// X004: Another run holds the advisory lock
    #[error(
        "[X004] Migrations are locked by {owner} since {since}. \
         If no other run is active, clear it with `cairn migrate --force-unlock`"
    )]
    LockHeld { owner: String, since: String },

    /// X005: Other database failure
    #[error("[X005] Database error: {0}")]
    Db(#[from] DbError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True for reconciliation failures, which halt before any mutation.
    pub fn is_integrity(&self) -> bool {
        matches!(self, EngineError::Integrity(_))
    }
}
