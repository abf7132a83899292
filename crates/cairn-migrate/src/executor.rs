//! Application of a single migration against the database.

use crate::error::{EngineError, EngineResult};
use cairn_core::{Change, Config, Migration, MigrationLog, Row};
use cairn_db::{Database, DbError};

/// Applies migrations one at a time and records them in the log.
pub struct Executor<'a> {
    db: &'a dyn Database,
    log_table: &'a str,
    transactional: bool,
}

impl<'a> Executor<'a> {
    pub fn new(db: &'a dyn Database, config: &'a Config) -> Self {
        Self {
            db,
            log_table: &config.log_table,
            transactional: config.transactional && db.supports_transactional_ddl(),
        }
    }

    /// Whether each migration runs inside its own transaction.
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Apply schema changes, then data changes, then append the log row.
    ///
    /// In transactional mode a failure rolls back the whole migration.
    /// Otherwise changes already applied stay in place and no log row is
    /// written.
    pub fn apply(&self, migration: &Migration) -> EngineResult<MigrationLog> {
        log::info!("Applying migration {}", migration.filename());
        if self.transactional {
            self.in_transaction(|| self.apply_and_record(migration))
        } else {
            self.apply_and_record(migration)
        }
    }

    fn in_transaction<T>(&self, body: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        self.db.begin()?;

        let result = body();

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.db.commit() {
                    if let Err(rollback_err) = self.db.rollback() {
                        log::warn!("Rollback after failed commit failed: {rollback_err}");
                    }
                    return Err(commit_err.into());
                }
            }
            Err(_) => {
                if let Err(rollback_err) = self.db.rollback() {
                    log::warn!("Rollback failed: {rollback_err}");
                }
            }
        }
        result
    }

    fn apply_and_record(&self, migration: &Migration) -> EngineResult<MigrationLog> {
        for change in migration.changes() {
            self.apply_change(migration.filename(), change)?;
        }

        self.db
            .append_log(self.log_table, migration.filename(), migration.checksum())
            .map_err(|source| EngineError::LogStorage {
                context: format!("recording {}", migration.filename()),
                source,
            })
    }

    fn apply_change(&self, filename: &str, change: &Change) -> EngineResult<()> {
        match change {
            Change::CreateTable(definition) => {
                log::debug!("{filename}: create table {}", definition.name);
                self.db
                    .create_table(definition)
                    .map_err(|source| EngineError::SchemaApply {
                        filename: filename.to_string(),
                        table: definition.name.clone(),
                        source,
                    })
            }
            Change::InsertRows { table, rows } => {
                log::debug!("{filename}: insert {} row(s) into {table}", rows.len());
                for (row_index, row) in rows.iter().enumerate() {
                    self.insert_row(table, row).map_err(|source| EngineError::DataApply {
                        filename: filename.to_string(),
                        table: table.clone(),
                        row_index,
                        source,
                    })?;
                }
                Ok(())
            }
            Change::Unknown { raw } => {
                log::debug!("{filename}: skipping unrecognised change {raw:?}");
                Ok(())
            }
        }
    }

    fn insert_row(&self, table: &str, row: &Row) -> Result<(), DbError> {
        if row.is_empty() {
            return Err(DbError::ExecutionError("row has no columns".to_string()));
        }
        self.db.insert(table, &row.columns(), &row.values())
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
