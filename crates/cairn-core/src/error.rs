//! Error types for cairn-core

use thiserror::Error;

/// Core error type for Cairn
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Migrations directory does not exist
    #[error("[C001] Migrations directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// C002: Migrations directory exists but cannot be listed
    #[error("[C002] Cannot read migrations directory '{path}': {source}")]
    DirectoryUnreadable {
        path: String,
        source: std::io::Error,
    },

    /// C003: A migration file could not be read or parsed
    #[error("[C003] Failed to load migration '{filename}': {cause}")]
    MigrationLoad {
        filename: String,
        cause: Box<CoreError>,
    },

    /// C004: `insert` change without a target table
    #[error("[C004] Malformed insert: missing 'table'")]
    MalformedInsert,

    /// C005: An insert row that is not a mapping
    #[error("[C005] Malformed row: expected a mapping of column to value, found {row}")]
    MalformedRow { row: String },

    /// C006: Change entry with no recognised operation key
    #[error("[C006] Unknown change kind with keys [{keys}]. Expected 'create_table' or 'insert'")]
    UnknownChangeKind { keys: String },

    /// C007: Change entry that is not a mapping
    #[error("[C007] Malformed change: {message}")]
    MalformedChange { message: String },

    /// C008: `create_table` definition that does not deserialize
    #[error("[C008] Malformed table definition: {message}")]
    MalformedTable { message: String },

    /// C009: Migration document has an invalid top-level shape
    #[error("[C009] Malformed migration document: {message}")]
    MalformedDocument { message: String },

    /// C010: Configuration file not found
    #[error("[C010] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C011: Failed to parse configuration file
    #[error("[C011] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C012: Invalid configuration value
    #[error("[C012] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C013: IO error with file path context
    #[error("[C013] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C014: YAML parse error
    #[error("[C014] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// C015: File name too long to be recorded in the migration log
    #[error("[C015] File name is {len} characters long; the migration log holds at most {max}")]
    FilenameTooLong { len: usize, max: usize },
}

impl CoreError {
    /// Wrap an error as a load failure for `filename`.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn into_load_error(self, filename: &str) -> CoreError {
        match self {
            CoreError::MigrationLoad { .. } => self,
            other => CoreError::MigrationLoad {
                filename: filename.to_string(),
                cause: Box::new(other),
            },
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Integrity violations found while reconciling migrations against the log.
///
/// Either variant halts the run before any database mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// R001: A previously applied migration file has disappeared
    #[error("[R001] Previously applied migration '{filename}' is missing from the migrations directory")]
    MissingMigrationFile { filename: String },

    /// R002: A previously applied migration was edited after being applied
    #[error("[R002] Migration '{filename}' was modified after it was applied (expected checksum {expected}, found {actual})")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },
}
