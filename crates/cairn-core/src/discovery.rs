//! Migration file discovery

use crate::error::{CoreError, CoreResult};
use crate::migration_file::MigrationFile;
use std::collections::HashMap;
use std::path::Path;

/// List migration files under `root`, sorted by [`MigrationFile`] order.
///
/// Only regular files with a `.yaml`/`.yml` extension are considered; hidden
/// files and subdirectories are ignored.
pub fn discover(root: &Path) -> CoreResult<Vec<MigrationFile>> {
    if !root.is_dir() {
        return Err(CoreError::DirectoryNotFound {
            path: root.display().to_string(),
        });
    }

    let unreadable = |e: std::io::Error| CoreError::DirectoryUnreadable {
        path: root.display().to_string(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(root).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if !entry.file_type().map_err(unreadable)?.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            log::warn!(
                "Ignoring non UTF-8 file name in {}: {:?}",
                root.display(),
                entry.file_name()
            );
            continue;
        };
        if name.starts_with('.') || !MigrationFile::has_migration_extension(&name) {
            continue;
        }

        if let Some(file) = MigrationFile::try_new(name) {
            files.push(file);
        }
    }

    files.sort();
    warn_duplicate_prefixes(&files);
    Ok(files)
}

fn warn_duplicate_prefixes(files: &[MigrationFile]) {
    let mut by_prefix: HashMap<u64, Vec<&str>> = HashMap::new();
    for file in files {
        if let Some(prefix) = file.prefix_number() {
            by_prefix.entry(prefix).or_default().push(file.filename());
        }
    }
    let mut duplicates: Vec<_> = by_prefix.into_iter().filter(|(_, v)| v.len() > 1).collect();
    duplicates.sort_by_key(|(prefix, _)| *prefix);
    for (prefix, names) in duplicates {
        log::warn!(
            "Migrations share numeric prefix {}: {} (ordered by file name)",
            prefix,
            names.join(", ")
        );
    }
}
