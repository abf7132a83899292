//! SQL rendering for table definitions, inserts, and Cairn's own tables.
//!
//! Identifiers are always quoted. Literal values only appear in column
//! defaults; row values are bound as parameters by the backend.

use crate::error::{DbError, DbResult};
use cairn_core::checksum::CHECKSUM_LEN;
use cairn_core::migration_file::FILENAME_MAX_LEN;
use cairn_core::sql_utils::{escape_sql_string, quote_ident, quote_qualified};
use cairn_core::{CellValue, ColumnDefinition, TableDefinition};

/// Render `CREATE TABLE` for a definition.
pub fn create_table_sql(def: &TableDefinition) -> DbResult<String> {
    def.validate().map_err(DbError::InvalidDefinition)?;

    let primary_key = def.primary_key_columns();
    let mut parts = Vec::with_capacity(def.columns.len() + 1);
    for column in &def.columns {
        let in_key = primary_key.contains(&column.name.as_str());
        parts.push(column_sql(column, in_key)?);
    }
    if !primary_key.is_empty() {
        let keys: Vec<String> = primary_key.iter().map(|k| quote_ident(k)).collect();
        parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_qualified(&def.name),
        parts.join(",\n    ")
    ))
}

fn column_sql(column: &ColumnDefinition, in_primary_key: bool) -> DbResult<String> {
    let mut sql = format!("{} {}", quote_ident(&column.name), column_type_sql(column)?);
    if !column.nullable || in_primary_key {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default_sql(&CellValue::from_yaml(default)));
    }
    if column.unique && !in_primary_key {
        sql.push_str(" UNIQUE");
    }
    Ok(sql)
}

/// Map a logical column type to a DuckDB type.
///
/// Unrecognised names are passed through uppercased, so native types such as
/// `uuid` or `hugeint` work without a mapping entry.
pub fn column_type_sql(column: &ColumnDefinition) -> DbResult<String> {
    let logical = column.data_type.trim().to_ascii_lowercase();
    let sized = |base: &str| match column.size {
        Some(size) => format!("{base}({size})"),
        None => base.to_string(),
    };

    let rendered = match logical.as_str() {
        "string" | "varchar" => sized("VARCHAR"),
        "text" => "VARCHAR".to_string(),
        "integer" | "int" => "INTEGER".to_string(),
        "bigint" => "BIGINT".to_string(),
        "smallint" => "SMALLINT".to_string(),
        "float" | "double" => "DOUBLE".to_string(),
        "real" => "REAL".to_string(),
        "decimal" | "numeric" => match (column.size, column.scale) {
            (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
            (Some(p), None) => format!("DECIMAL({p}, 0)"),
            (None, _) => "DECIMAL".to_string(),
        },
        "boolean" | "bool" => "BOOLEAN".to_string(),
        "date" => "DATE".to_string(),
        "time" => "TIME".to_string(),
        "timestamp" | "datetime" => "TIMESTAMP".to_string(),
        other => {
            let is_type_name = other
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && other.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ');
            if !is_type_name {
                return Err(DbError::InvalidDefinition(format!(
                    "column '{}' has unsupported type '{}'",
                    column.name, column.data_type
                )));
            }
            sized(&other.to_ascii_uppercase())
        }
    };
    Ok(rendered)
}

/// Render a column default as a SQL literal.
pub fn default_sql(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Bool(true) => "TRUE".to_string(),
        CellValue::Bool(false) => "FALSE".to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) => f.to_string(),
        CellValue::Text(s) if s.eq_ignore_ascii_case("now") => "current_timestamp".to_string(),
        CellValue::Text(s) => format!("'{}'", escape_sql_string(s)),
    }
}

/// Render a single-row parameterised insert.
pub fn insert_sql(table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let params = vec!["?"; columns.len()];
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_qualified(table),
        cols.join(", "),
        params.join(", ")
    )
}

/// Name of the sequence backing the log table's `seq` column.
pub fn log_sequence_name(table: &str) -> String {
    format!("{table}_seq")
}

/// DDL for the migration log table.
///
/// `table` must be a plain identifier (checked by the backend) because the
/// sequence name is also used inside a string literal. `seq` records the
/// order in which migrations were applied.
pub fn log_table_sql(table: &str) -> String {
    let seq = log_sequence_name(table);
    format!(
        "CREATE SEQUENCE IF NOT EXISTS {seq};
         CREATE TABLE IF NOT EXISTS {table_ident} (
             seq         BIGINT NOT NULL DEFAULT nextval('{seq}'),
             \"timestamp\" TIMESTAMP NOT NULL DEFAULT current_timestamp,
             filename    VARCHAR({name_max}) NOT NULL CHECK (length(filename) <= {name_max}),
             checksum    VARCHAR({sum_len}) NOT NULL CHECK (length(checksum) = {sum_len})
         );",
        table_ident = quote_ident(table),
        name_max = FILENAME_MAX_LEN,
        sum_len = CHECKSUM_LEN,
    )
}

/// DDL for the advisory lock table. A single row with `lock_id = 1` is the lock.
pub fn lock_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
             lock_id     INTEGER PRIMARY KEY,
             owner       VARCHAR NOT NULL,
             acquired_at TIMESTAMP NOT NULL
         )",
        quote_ident(table)
    )
}
