//! Declarative change operations parsed from migration documents.
//!
//! A migration body holds two sequences of change entries. Each entry is a
//! YAML mapping classified by its operation key:
//!
//! ```yaml
//! changes:
//!   - create_table:
//!       name: users
//!       columns:
//!         - { name: id, type: integer, primary_key: true }
//!         - { name: email, type: string, size: 255, nullable: false }
//! up:
//!   - insert:
//!       table: users
//!       rows:
//!         - { id: 1, email: admin@example.com }
//! ```

use crate::config::UnknownChangePolicy;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

const CREATE_TABLE_KEY: &str = "create_table";
const INSERT_KEY: &str = "insert";
const TABLE_KEY: &str = "table";
const ROWS_KEY: &str = "rows";

/// Options controlling how change entries are classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Policy for entries with no recognised operation key
    pub unknown_changes: UnknownChangePolicy,
}

/// One schema or data operation within a migration.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table from a declarative definition
    CreateTable(TableDefinition),

    /// Insert rows into an existing table, one statement per row
    InsertRows { table: String, rows: Vec<Row> },

    /// Unrecognised entry kept verbatim; has no effect when applied
    Unknown { raw: Value },
}

impl Change {
    /// Classify one change entry.
    pub fn parse(entry: &Value, options: &ParseOptions) -> CoreResult<Change> {
        let map = entry.as_mapping().ok_or_else(|| CoreError::MalformedChange {
            message: format!("expected a mapping, found {}", render_value(entry)),
        })?;

        if let Some(definition) = map.get(CREATE_TABLE_KEY) {
            return parse_create_table(definition);
        }

        if let Some(insert) = map.get(INSERT_KEY) {
            return parse_insert(insert, map);
        }

        match options.unknown_changes {
            UnknownChangePolicy::Reject => Err(CoreError::UnknownChangeKind {
                keys: map
                    .keys()
                    .map(render_key)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            UnknownChangePolicy::Ignore => Ok(Change::Unknown { raw: entry.clone() }),
        }
    }

    /// Parse an optional sequence of change entries.
    ///
    /// `None` and `null` both yield an empty list.
    pub fn parse_all(entries: Option<&Value>, options: &ParseOptions) -> CoreResult<Vec<Change>> {
        match entries {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(seq)) => seq.iter().map(|e| Change::parse(e, options)).collect(),
            Some(other) => Err(CoreError::MalformedDocument {
                message: format!(
                    "change list must be a sequence, found {}",
                    render_value(other)
                ),
            }),
        }
    }

    /// Short name of the operation, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Change::CreateTable(_) => CREATE_TABLE_KEY,
            Change::InsertRows { .. } => INSERT_KEY,
            Change::Unknown { .. } => "unknown",
        }
    }
}

fn parse_create_table(definition: &Value) -> CoreResult<Change> {
    let def: TableDefinition =
        serde_yaml::from_value(definition.clone()).map_err(|e| CoreError::MalformedTable {
            message: e.to_string(),
        })?;
    def.validate()
        .map_err(|message| CoreError::MalformedTable { message })?;
    Ok(Change::CreateTable(def))
}

/// Accepts `insert: { table, rows }`, `insert: <table>` with sibling `rows`,
/// and a bare `insert:` key with sibling `table`/`rows`.
fn parse_insert(insert: &Value, entry: &Mapping) -> CoreResult<Change> {
    let (table, rows) = match insert {
        Value::Mapping(body) => (body.get(TABLE_KEY), body.get(ROWS_KEY)),
        Value::String(_) => (Some(insert), entry.get(ROWS_KEY)),
        _ => (entry.get(TABLE_KEY), entry.get(ROWS_KEY)),
    };

    let table = match table {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => return Err(CoreError::MalformedInsert),
    };

    let rows = match rows {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(seq)) => seq.iter().map(Row::from_yaml).collect::<CoreResult<_>>()?,
        Some(other) => {
            return Err(CoreError::MalformedChange {
                message: format!(
                    "'rows' for table '{table}' must be a sequence, found {}",
                    render_value(other)
                ),
            })
        }
    };

    Ok(Change::InsertRows { table, rows })
}

/// Declarative table definition carried by `create_table`.
///
/// Column types are interpreted by the database backend; this crate only
/// checks structural consistency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDefinition {
    /// Table name, optionally schema-qualified
    pub name: String,

    /// Column definitions in declaration order
    pub columns: Vec<ColumnDefinition>,

    /// Table-level (possibly composite) primary key
    #[serde(default)]
    pub primary_key: Vec<String>,
}

/// One column of a [`TableDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Logical type (`string`, `integer`, `timestamp`, ...) or a native type name
    #[serde(rename = "type")]
    pub data_type: String,

    /// Length for strings, precision for decimals
    #[serde(default)]
    pub size: Option<u32>,

    /// Scale for decimals
    #[serde(default)]
    pub scale: Option<u32>,

    /// Whether NULL is allowed
    #[serde(default = "crate::serde_helpers::default_true")]
    pub nullable: bool,

    /// Default value; the string `now` means the current timestamp
    #[serde(default)]
    pub default: Option<Value>,

    /// Column-level primary key flag
    #[serde(default)]
    pub primary_key: bool,

    /// Column-level unique constraint
    #[serde(default)]
    pub unique: bool,
}

impl TableDefinition {
    /// Check structural consistency of the definition.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("table name cannot be empty".to_string());
        }
        if self.columns.is_empty() {
            return Err(format!("table '{}' must define at least one column", self.name));
        }

        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(format!("table '{}' has a column without a name", self.name));
            }
            if column.data_type.trim().is_empty() {
                return Err(format!(
                    "column '{}.{}' has an empty type",
                    self.name, column.name
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(format!(
                    "table '{}' defines column '{}' more than once",
                    self.name, column.name
                ));
            }
            if let Some(CellValue::Float(f)) = column.default.as_ref().map(CellValue::from_yaml) {
                if !f.is_finite() {
                    return Err(format!(
                        "column '{}.{}' has a non-finite default ({f})",
                        self.name, column.name
                    ));
                }
            }
        }

        for key in &self.primary_key {
            if !seen.contains(key.as_str()) {
                return Err(format!(
                    "primary key column '{}' is not defined on table '{}'",
                    key, self.name
                ));
            }
        }

        if !self.primary_key.is_empty() && self.columns.iter().any(|c| c.primary_key) {
            return Err(format!(
                "table '{}' declares both a table-level and a column-level primary key",
                self.name
            ));
        }

        Ok(())
    }

    /// Primary key columns, whether declared at table or column level.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        if !self.primary_key.is_empty() {
            return self.primary_key.iter().map(String::as_str).collect();
        }
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// A scalar value bound into an insert statement.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Convert a YAML value. Sequences and mappings become their JSON text.
    pub fn from_yaml(value: &Value) -> CellValue {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => CellValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Sequence(_) | Value::Mapping(_) => CellValue::Text(render_value(value)),
            Value::Tagged(tagged) => CellValue::from_yaml(&tagged.value),
        }
    }
}

/// One row of an insert, as `(column, value)` pairs in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    /// Convert a YAML mapping into a row, rejecting anything else.
    pub fn from_yaml(value: &Value) -> CoreResult<Row> {
        let map = value.as_mapping().ok_or_else(|| CoreError::MalformedRow {
            row: render_value(value),
        })?;

        let mut cells = Vec::with_capacity(map.len());
        for (key, cell) in map {
            let column = match key {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(CoreError::MalformedRow {
                        row: render_value(value),
                    })
                }
            };
            cells.push((column, CellValue::from_yaml(cell)));
        }
        Ok(Row { cells })
    }

    /// Column names in document order.
    pub fn columns(&self) -> Vec<String> {
        self.cells.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Values in column order.
    pub fn values(&self) -> Vec<CellValue> {
        self.cells.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn render_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => render_value(other),
    }
}

/// Compact single-line rendering of a YAML value for error messages.
pub(crate) fn render_value(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

#[cfg(test)]
#[path = "change_test.rs"]
mod tests;
