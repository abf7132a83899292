//! Loaded migrations: file content, checksum, and parsed changes.

use crate::change::{Change, ParseOptions};
use crate::checksum::compute_checksum;
use crate::config::LoadErrorPolicy;
use crate::error::{CoreError, CoreResult};
use crate::migration_file::{MigrationFile, FILENAME_MAX_LEN};
use serde_yaml::Value;
use std::path::Path;

/// Top-level key holding schema changes.
pub const SCHEMA_CHANGES_KEY: &str = "changes";

/// Top-level key holding data changes.
pub const DATA_CHANGES_KEY: &str = "up";

/// A fully loaded migration.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    filename: String,
    checksum: String,
    schema_changes: Vec<Change>,
    data_changes: Vec<Change>,
}

impl Migration {
    /// Assemble a migration from already-parsed parts.
    pub fn new(
        filename: impl Into<String>,
        checksum: impl Into<String>,
        schema_changes: Vec<Change>,
        data_changes: Vec<Change>,
    ) -> Self {
        Self {
            filename: filename.into(),
            checksum: checksum.into(),
            schema_changes,
            data_changes,
        }
    }

    /// Read and parse `file` from the migrations directory `dir`.
    pub fn load(dir: &Path, file: &MigrationFile, options: &ParseOptions) -> CoreResult<Self> {
        let path = dir.join(file.filename());
        let content = std::fs::read(&path).map_err(|e| {
            CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            }
            .into_load_error(file.filename())
        })?;
        Self::from_content(file.filename(), &content, options)
            .map_err(|e| e.into_load_error(file.filename()))
    }

    /// Build a migration from raw file bytes.
    ///
    /// The checksum covers the exact bytes, so any edit is detectable even if
    /// it does not change the parsed changes. Names too long for the log are
    /// rejected here so they never reach execution.
    pub fn from_content(filename: &str, content: &[u8], options: &ParseOptions) -> CoreResult<Self> {
        let len = filename.chars().count();
        if len > FILENAME_MAX_LEN {
            return Err(CoreError::FilenameTooLong {
                len,
                max: FILENAME_MAX_LEN,
            });
        }

        let checksum = compute_checksum(content);

        let text = std::str::from_utf8(content).map_err(|e| CoreError::MalformedDocument {
            message: format!("content is not valid UTF-8: {e}"),
        })?;
        if text.trim().is_empty() {
            return Err(CoreError::MalformedDocument {
                message: "document is empty".to_string(),
            });
        }
        let document: Value = serde_yaml::from_str(text)?;
        let body = match &document {
            Value::Mapping(map) => map,
            Value::Null => {
                return Err(CoreError::MalformedDocument {
                    message: "document is empty".to_string(),
                })
            }
            _ => {
                return Err(CoreError::MalformedDocument {
                    message: format!(
                        "expected a mapping with '{SCHEMA_CHANGES_KEY}' and/or '{DATA_CHANGES_KEY}'"
                    ),
                })
            }
        };

        let schema_changes = Change::parse_all(body.get(SCHEMA_CHANGES_KEY), options)?;
        let data_changes = Change::parse_all(body.get(DATA_CHANGES_KEY), options)?;

        Ok(Self::new(filename, checksum, schema_changes, data_changes))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn schema_changes(&self) -> &[Change] {
        &self.schema_changes
    }

    pub fn data_changes(&self) -> &[Change] {
        &self.data_changes
    }

    /// All changes in application order: schema first, then data.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.schema_changes.iter().chain(self.data_changes.iter())
    }
}

/// Options for [`load_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub on_error: LoadErrorPolicy,
    pub parse: ParseOptions,
}

/// A file dropped under [`LoadErrorPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Result of loading a set of migration files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutcome {
    /// Successfully loaded migrations, in file order
    pub migrations: Vec<Migration>,

    /// Files that failed to load and were skipped
    pub skipped: Vec<SkippedFile>,
}

/// Load every file in order, applying the configured failure policy.
pub fn load_all(dir: &Path, files: &[MigrationFile], options: &LoadOptions) -> CoreResult<LoadOutcome> {
    let mut outcome = LoadOutcome::default();

    for file in files {
        match Migration::load(dir, file, &options.parse) {
            Ok(migration) => {
                log::debug!(
                    "Loaded {} ({} schema, {} data changes, checksum {})",
                    migration.filename(),
                    migration.schema_changes().len(),
                    migration.data_changes().len(),
                    migration.checksum()
                );
                outcome.migrations.push(migration);
            }
            Err(err) => match options.on_error {
                LoadErrorPolicy::Abort => return Err(err),
                LoadErrorPolicy::Skip => {
                    log::warn!("Skipping migration: {err}");
                    outcome.skipped.push(SkippedFile {
                        filename: file.filename().to_string(),
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(outcome)
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
