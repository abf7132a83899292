//! cairn-core - Core library for Cairn
//!
//! This crate provides the migration data model, configuration parsing,
//! migration discovery and loading, change parsing, content checksums, and
//! the reconciler that checks discovered migrations against the applied log.

pub mod change;
pub mod checksum;
pub mod config;
pub mod discovery;
pub mod error;
pub mod migration;
pub mod migration_file;
pub mod migration_log;
pub mod reconcile;
pub(crate) mod serde_helpers;
pub mod sql_utils;

pub use change::{CellValue, Change, ColumnDefinition, ParseOptions, Row, TableDefinition};
pub use checksum::compute_checksum;
pub use config::{Config, LoadErrorPolicy, UnknownChangePolicy};
pub use discovery::discover;
pub use error::{CoreError, CoreResult, ReconcileError};
pub use migration::{load_all, LoadOptions, LoadOutcome, Migration, SkippedFile};
pub use migration_file::MigrationFile;
pub use migration_log::MigrationLog;
pub use reconcile::{reconcile, Plan};
