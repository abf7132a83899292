//! Error types for cairn-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table not found: {0}")]
    TableNotFound(String),

    /// Table already exists (D004)
    #[error("[D004] Table already exists: {0}")]
    TableExists(String),

    /// Table definition cannot be rendered (D005)
    #[error("[D005] Invalid table definition: {0}")]
    InvalidDefinition(String),

    /// Transaction management error (D006)
    #[error("[D006] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D007)
    #[error("[D007] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so classify by
        // message with narrow patterns.
        let msg = err.to_string();
        if msg.contains("already exists") {
            DbError::TableExists(msg)
        } else if msg.contains("Table with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
