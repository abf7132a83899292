//! Configuration types and parsing for cairn.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use crate::sql_utils::is_plain_identifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names looked up in a project directory, in priority order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["cairn.yml", "cairn.yaml"];

/// Project configuration from cairn.yml
///
/// Every field has a default, so a project without a config file behaves as
/// if an empty `cairn.yml` were present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory containing migration files, relative to the project root
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Table holding the applied-migration log
    #[serde(default = "default_log_table")]
    pub log_table: String,

    /// Table holding the advisory run lock
    #[serde(default = "default_lock_table")]
    pub lock_table: String,

    /// Take the advisory lock for the duration of a run
    #[serde(default = "default_true")]
    pub lock: bool,

    /// Wrap each migration in a transaction when the backend supports it
    #[serde(default = "default_true")]
    pub transactional: bool,

    /// What to do when a migration file fails to load
    #[serde(default)]
    pub on_load_error: LoadErrorPolicy,

    /// What to do with change entries that are neither `create_table` nor `insert`
    #[serde(default)]
    pub unknown_changes: UnknownChangePolicy,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file, or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Policy for migration files that fail to read or parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadErrorPolicy {
    /// Fail the whole run before touching the database (default)
    #[default]
    Abort,
    /// Log the failure and continue without the file
    Skip,
}

/// Policy for unrecognised change entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownChangePolicy {
    /// Fail parsing with `UnknownChangeKind` (default)
    #[default]
    Reject,
    /// Keep the entry as an inert `Unknown` change
    Ignore,
}

impl std::fmt::Display for LoadErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadErrorPolicy::Abort => write!(f, "abort"),
            LoadErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// In-memory database marker understood by the DuckDB backend.
pub const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_MIGRATIONS_DIR: &str = "db/migrations";

const DEFAULT_DB_PATH: &str = "cairn.duckdb";

const DEFAULT_LOG_TABLE: &str = "_cairn_migrations";

const DEFAULT_LOCK_TABLE: &str = "_cairn_lock";

fn default_migrations_dir() -> String {
    DEFAULT_MIGRATIONS_DIR.to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_log_table() -> String {
    DEFAULT_LOG_TABLE.to_string()
}

fn default_lock_table() -> String {
    DEFAULT_LOCK_TABLE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            database: DatabaseConfig::default(),
            log_table: default_log_table(),
            lock_table: default_lock_table(),
            lock: true,
            transactional: true,
            on_load_error: LoadErrorPolicy::default(),
            unknown_changes: UnknownChangePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            CoreError::ConfigParseError { message } => CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    ///
    /// An empty document yields the default configuration.
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for cairn.yml or cairn.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match Self::find_in_dir(dir) {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    /// Load configuration from a project directory, falling back to defaults
    /// when no config file exists.
    pub fn load_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::find_in_dir(dir) {
            Some(path) => Self::load(&path),
            None => {
                log::debug!(
                    "No config file in {}, using defaults",
                    dir.display()
                );
                Ok(Self::default())
            }
        }
    }

    fn find_in_dir(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        for (key, table) in [("log_table", &self.log_table), ("lock_table", &self.lock_table)] {
            if !is_plain_identifier(table) {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{key} '{table}' is not a valid table name (letters, digits and '_', not starting with a digit)"
                    ),
                });
            }
        }

        if self.log_table.eq_ignore_ascii_case(&self.lock_table) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "log_table and lock_table must differ (both are '{}')",
                    self.log_table
                ),
            });
        }

        Ok(())
    }

    /// Get the absolute migrations directory relative to a project root
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_dir)
    }

    /// Resolve the database path against a project root.
    ///
    /// `:memory:` and absolute paths are returned unchanged.
    pub fn database_path_absolute(&self, root: &Path) -> String {
        if self.database.path == MEMORY_DB_PATH || Path::new(&self.database.path).is_absolute() {
            self.database.path.clone()
        } else {
            root.join(&self.database.path).display().to_string()
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
