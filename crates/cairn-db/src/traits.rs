//! Database trait definition

use crate::error::DbResult;
use cairn_core::{CellValue, MigrationLog, TableDefinition};

/// Outcome of trying to take the advisory run lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    /// The lock row was inserted; the caller owns the lock
    Acquired,
    /// Another run holds the lock
    Held { owner: String, since: String },
}

/// Database collaborator driven by the migration engine.
///
/// All calls are synchronous and blocking. Implementations must be
/// Send + Sync so a backend can be shared behind an `Arc`.
pub trait Database: Send + Sync {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Check if a table exists
    fn table_exists(&self, name: &str) -> DbResult<bool>;

    /// Create a table; fails if it already exists or the definition is invalid
    fn create_table(&self, definition: &TableDefinition) -> DbResult<()>;

    /// Insert a single row; `columns` and `values` are parallel
    fn insert(&self, table: &str, columns: &[String], values: &[CellValue]) -> DbResult<()>;

    /// Create the migration log table if absent; returns `true` when created
    fn ensure_log_table(&self, table: &str) -> DbResult<bool>;

    /// Read the migration log ordered by application time
    fn read_log(&self, table: &str) -> DbResult<Vec<MigrationLog>>;

    /// Append one log row stamped with the current time
    fn append_log(&self, table: &str, filename: &str, checksum: &str) -> DbResult<MigrationLog>;

    /// Whether DDL participates in transactions, so a failed migration can be
    /// rolled back completely
    fn supports_transactional_ddl(&self) -> bool {
        false
    }

    /// Start a transaction
    fn begin(&self) -> DbResult<()>;

    /// Commit the current transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the current transaction
    fn rollback(&self) -> DbResult<()>;

    /// Try to take the advisory run lock, creating the lock table if needed
    fn try_lock(&self, lock_table: &str, owner: &str) -> DbResult<LockAttempt>;

    /// Release the advisory lock. With `owner` set, only that owner's lock is
    /// released; `None` clears any lock.
    fn unlock(&self, lock_table: &str, owner: Option<&str>) -> DbResult<()>;
}
