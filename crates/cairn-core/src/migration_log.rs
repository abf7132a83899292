//! Persisted record of an applied migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the applied-migration log.
///
/// Rows are appended once, when a migration finishes, and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationLog {
    /// When the migration finished applying
    pub timestamp: DateTime<Utc>,

    /// Migration file name
    pub filename: String,

    /// Content checksum recorded at apply time
    pub checksum: String,
}

impl MigrationLog {
    pub fn new(
        timestamp: DateTime<Utc>,
        filename: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            filename: filename.into(),
            checksum: checksum.into(),
        }
    }

    /// Audit line printed for already-applied migrations.
    pub fn audit_line(&self) -> String {
        format!(
            "{}  {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.filename
        )
    }
}
