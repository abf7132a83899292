//! New command implementation - scaffolds the next migration file

use anyhow::{Context, Result};
use cairn_core::{discover, MigrationFile};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common;

const TEMPLATE: &str = r#"# Schema changes run first, then data changes.
# Do not edit this file once it has been applied: its checksum is recorded.
changes: []
#  - create_table:
#      name: example
#      columns:
#        - { name: id, type: integer, primary_key: true }
#        - { name: label, type: string, size: 80, nullable: false }

up: []
#  - insert:
#      table: example
#      rows:
#        - { id: 1, label: first }
"#;

/// Execute the new command
pub(crate) fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let dir = Path::new(&config.migrations_dir);

    let existing = if dir.is_dir() {
        discover(dir).context("Failed to scan migrations directory")?
    } else {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Vec::new()
    };

    let filename = migration_filename(next_prefix(&existing), &args.name)?;
    let path = dir.join(&filename);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write!(file, "# {filename}\n{TEMPLATE}")
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    Ok(())
}

/// One more than the highest numeric prefix in use.
fn next_prefix(existing: &[MigrationFile]) -> u64 {
    existing
        .iter()
        .filter_map(MigrationFile::prefix_number)
        .max()
        .map_or(1, |max| max + 1)
}

/// `NNN-name.yaml`, with the prefix zero-padded to at least three digits.
fn migration_filename(prefix: u64, name: &str) -> Result<String> {
    let name = name.trim();
    let stem = name
        .strip_suffix(".yaml")
        .or_else(|| name.strip_suffix(".yml"))
        .unwrap_or(name);

    if stem.is_empty()
        || stem.contains('/')
        || stem.contains('\\')
        || stem.contains("..")
        || stem.starts_with('.')
    {
        anyhow::bail!(
            "Invalid migration name '{name}': must be non-empty and must not contain '/', '\\', '..', or start with '.'"
        );
    }

    let stem = stem.replace(char::is_whitespace, "_");
    Ok(format!("{prefix:03}-{stem}.yaml"))
}
