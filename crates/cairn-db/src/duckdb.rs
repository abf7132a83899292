//! DuckDB database backend implementation

use crate::ddl;
use crate::error::{DbError, DbResult};
use crate::traits::{Database, LockAttempt};
use cairn_core::sql_utils::{is_plain_identifier, quote_ident, split_qualified_name};
use cairn_core::{CellValue, MigrationLog, TableDefinition};
use chrono::{DateTime, Utc};
use duckdb::types::Value;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Row id of the single advisory lock row.
const LOCK_ROW_ID: i64 = 1;

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == cairn_core::config::MEMORY_DB_PATH {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Query a single count value synchronously
    pub fn query_count(&self, sql: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count as usize)
    }

    fn require_plain_identifier(kind: &str, name: &str) -> DbResult<()> {
        if is_plain_identifier(name) {
            Ok(())
        } else {
            Err(DbError::InvalidDefinition(format!(
                "{kind} name '{name}' must be a plain identifier"
            )))
        }
    }

    fn table_exists_on(conn: &Connection, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified_name(name);
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count > 0)
    }

    fn read_lock_row(conn: &Connection, lock_table: &str) -> DbResult<Option<(String, i64)>> {
        let sql = format!(
            "SELECT owner, epoch_us(acquired_at) FROM {} WHERE lock_id = ?",
            quote_ident(lock_table)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(duckdb::params![LOCK_ROW_ID], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().next())
    }
}

/// Current time truncated to the microsecond precision DuckDB stores.
fn now_micros() -> (i64, DateTime<Utc>) {
    let micros = Utc::now().timestamp_micros();
    let ts = DateTime::from_timestamp_micros(micros).unwrap_or_default();
    (micros, ts)
}

fn format_micros(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| micros.to_string())
}

fn to_duckdb_value(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Boolean(*b),
        CellValue::Int(i) => Value::BigInt(*i),
        CellValue::Float(f) => Value::Double(*f),
        CellValue::Text(s) => Value::Text(s.clone()),
    }
}

impl Database for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn table_exists(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        Self::table_exists_on(&conn, name)
    }

    fn create_table(&self, definition: &TableDefinition) -> DbResult<()> {
        let sql = ddl::create_table_sql(definition)?;
        let conn = self.conn()?;
        if Self::table_exists_on(&conn, &definition.name)? {
            return Err(DbError::TableExists(definition.name.clone()));
        }
        log::debug!("duckdb create table: {sql}");
        conn.execute_batch(&sql)?;
        Ok(())
    }

    fn insert(&self, table: &str, columns: &[String], values: &[CellValue]) -> DbResult<()> {
        if columns.is_empty() {
            return Err(DbError::ExecutionError(format!(
                "insert into '{table}' has no columns"
            )));
        }
        if columns.len() != values.len() {
            return Err(DbError::ExecutionError(format!(
                "insert into '{table}' has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }

        let sql = ddl::insert_sql(table, columns);
        let params: Vec<Value> = values.iter().map(to_duckdb_value).collect();
        log::debug!("duckdb insert: {sql}");
        self.conn()?
            .execute(&sql, duckdb::params_from_iter(params))
            .map_err(|e| match DbError::from(e) {
                DbError::TableNotFound(msg) => DbError::TableNotFound(msg),
                other => DbError::ExecutionError(format!("{other}: {sql}")),
            })?;
        Ok(())
    }

    fn ensure_log_table(&self, table: &str) -> DbResult<bool> {
        Self::require_plain_identifier("log table", table)?;
        let conn = self.conn()?;
        if Self::table_exists_on(&conn, table)? {
            return Ok(false);
        }
        log::info!("Creating migration log table {table}");
        conn.execute_batch(&ddl::log_table_sql(table))?;
        Ok(true)
    }

    fn read_log(&self, table: &str) -> DbResult<Vec<MigrationLog>> {
        let conn = self.conn()?;
        if !Self::table_exists_on(&conn, table)? {
            return Err(DbError::TableNotFound(table.to_string()));
        }

        // `seq` is the application order; timestamps come from the client
        // clock and may step backwards between runs.
        let sql = format!(
            "SELECT epoch_us(\"timestamp\"), filename, checksum FROM {} ORDER BY seq",
            quote_ident(table)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(micros, filename, checksum)| {
                let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                    DbError::ExecutionError(format!(
                        "log row for '{filename}' has an out-of-range timestamp ({micros})"
                    ))
                })?;
                Ok(MigrationLog::new(timestamp, filename, checksum))
            })
            .collect()
    }

    fn append_log(&self, table: &str, filename: &str, checksum: &str) -> DbResult<MigrationLog> {
        let (micros, timestamp) = now_micros();
        let sql = format!(
            "INSERT INTO {} (\"timestamp\", filename, checksum) VALUES (make_timestamp(CAST(? AS BIGINT)), ?, ?)",
            quote_ident(table)
        );
        self.conn()?
            .execute(&sql, duckdb::params![micros, filename, checksum])?;
        Ok(MigrationLog::new(timestamp, filename, checksum))
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn begin(&self) -> DbResult<()> {
        self.conn()?
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&self) -> DbResult<()> {
        self.conn()?
            .execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&self) -> DbResult<()> {
        self.conn()?
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn try_lock(&self, lock_table: &str, owner: &str) -> DbResult<LockAttempt> {
        Self::require_plain_identifier("lock table", lock_table)?;
        let conn = self.conn()?;
        conn.execute_batch(&ddl::lock_table_sql(lock_table))?;

        if let Some((holder, since)) = Self::read_lock_row(&conn, lock_table)? {
            return Ok(LockAttempt::Held {
                owner: holder,
                since: format_micros(since),
            });
        }

        let (micros, _) = now_micros();
        let sql = format!(
            "INSERT INTO {} (lock_id, owner, acquired_at) VALUES (?, ?, make_timestamp(CAST(? AS BIGINT)))",
            quote_ident(lock_table)
        );
        match conn.execute(&sql, duckdb::params![LOCK_ROW_ID, owner, micros]) {
            Ok(_) => Ok(LockAttempt::Acquired),
            // Lost a race with another run between the read and the insert.
            Err(e) => match Self::read_lock_row(&conn, lock_table)? {
                Some((holder, since)) => Ok(LockAttempt::Held {
                    owner: holder,
                    since: format_micros(since),
                }),
                None => Err(e.into()),
            },
        }
    }

    fn unlock(&self, lock_table: &str, owner: Option<&str>) -> DbResult<()> {
        Self::require_plain_identifier("lock table", lock_table)?;
        let conn = self.conn()?;
        if !Self::table_exists_on(&conn, lock_table)? {
            return Ok(());
        }
        let table = quote_ident(lock_table);
        match owner {
            Some(owner) => conn.execute(
                &format!("DELETE FROM {table} WHERE lock_id = ? AND owner = ?"),
                duckdb::params![LOCK_ROW_ID, owner],
            )?,
            None => conn.execute(
                &format!("DELETE FROM {table} WHERE lock_id = ?"),
                duckdb::params![LOCK_ROW_ID],
            )?,
        };
        Ok(())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
