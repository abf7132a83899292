//! Reconciliation of discovered migrations against the applied log.
//!
//! The log must be a prefix of the discovered migrations, compared position by
//! position on file name and checksum. Any divergence is an integrity error and
//! nothing is executed; otherwise the migrations past the end of the log are
//! pending.

use crate::error::ReconcileError;
use crate::migration::Migration;
use crate::migration_log::MigrationLog;

/// Check `logs` against `migrations` and return the number already applied.
///
/// Fails on the first index where a logged migration is missing, renamed, or
/// has a different checksum.
pub fn reconcile(migrations: &[Migration], logs: &[MigrationLog]) -> Result<usize, ReconcileError> {
    for (i, log) in logs.iter().enumerate() {
        let Some(migration) = migrations.get(i) else {
            return Err(ReconcileError::MissingMigrationFile {
                filename: log.filename.clone(),
            });
        };

        if migration.filename() != log.filename {
            return Err(ReconcileError::MissingMigrationFile {
                filename: log.filename.clone(),
            });
        }

        if migration.checksum() != log.checksum {
            return Err(ReconcileError::ChecksumMismatch {
                filename: log.filename.clone(),
                expected: log.checksum.clone(),
                actual: migration.checksum().to_string(),
            });
        }
    }

    Ok(logs.len())
}

/// Reconciled view of a migrations directory against its log.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Log rows of applied migrations, in application order
    pub applied: Vec<MigrationLog>,

    /// Migrations still to run, in file order
    pub pending: Vec<Migration>,
}

impl Plan {
    /// Reconcile and split `migrations` into applied and pending parts.
    pub fn build(mut migrations: Vec<Migration>, logs: Vec<MigrationLog>) -> Result<Self, ReconcileError> {
        let applied = reconcile(&migrations, &logs)?;
        let pending = migrations.split_off(applied);
        Ok(Self {
            applied: logs,
            pending,
        })
    }

    /// True when every discovered migration has been applied.
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
