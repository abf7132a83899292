//! cairn-migrate - Migration engine for Cairn
//!
//! Drives a [`cairn_db::Database`] through one migration run: discover and
//! load migration files, ensure the log table, take the run lock, reconcile
//! against the log, and apply whatever is pending.

pub mod error;
pub mod executor;
pub mod lock;
pub mod migrator;

pub use error::{EngineError, EngineResult};
pub use executor::Executor;
pub use lock::{force_unlock, LockGuard};
pub use migrator::{MigrationReport, Migrator, MigratorState};

#[cfg(test)]
pub(crate) mod testing;
