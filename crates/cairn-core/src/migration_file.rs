//! Discovered migration file names and their total order.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// File extensions recognised as migration documents.
pub const MIGRATION_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Longest file name, in characters, that fits in the migration log.
pub const FILENAME_MAX_LEN: usize = 120;

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:(\d+)-)?.+$").expect("valid filename regex"))
}

/// One migration file found on disk.
///
/// Ordering is by numeric prefix value (`2-x` before `10-x`), with files that
/// carry no prefix after every prefixed file, then by the full file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationFile {
    filename: String,
    /// Numeric prefix with leading zeros stripped, so `007` and `7` compare equal.
    prefix: Option<String>,
}

impl MigrationFile {
    /// Create a `MigrationFile`, returning `None` when the name does not match
    /// the `^(\d+-)?.+$` pattern.
    pub fn try_new(filename: impl Into<String>) -> Option<Self> {
        let filename = filename.into();
        let caps = filename_pattern().captures(&filename)?;
        let prefix = caps.get(1).map(|m| {
            let trimmed = m.as_str().trim_start_matches('0');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        });
        Some(Self { filename, prefix })
    }

    /// Return the file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Return the numeric prefix as a number, if present and representable.
    pub fn prefix_number(&self) -> Option<u64> {
        self.prefix.as_deref().and_then(|p| p.parse().ok())
    }

    /// Check whether a file name has a recognised migration extension.
    pub fn has_migration_extension(filename: &str) -> bool {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                MIGRATION_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }

    fn compare_prefix(a: Option<&str>, b: Option<&str>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl Ord for MigrationFile {
    fn cmp(&self, other: &Self) -> Ordering {
        Self::compare_prefix(self.prefix.as_deref(), other.prefix.as_deref())
            .then_with(|| self.filename.cmp(&other.filename))
    }
}

impl PartialOrd for MigrationFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MigrationFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename)
    }
}

impl AsRef<str> for MigrationFile {
    fn as_ref(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
#[path = "migration_file_test.rs"]
mod tests;
