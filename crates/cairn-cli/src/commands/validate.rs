//! Validate command implementation

use anyhow::{Context, Result};
use cairn_core::{discover, load_all, LoadErrorPolicy, LoadOptions, ParseOptions};
use cairn_migrate::Migrator;
use std::path::Path;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{self, engine_failure};

/// Execute the validate command
///
/// Loading always uses the abort policy, so any unreadable file fails.
pub(crate) fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let mut config = common::load_config(global)?;
    config.on_load_error = LoadErrorPolicy::Abort;

    if args.files_only {
        let dir = Path::new(&config.migrations_dir);
        let files = discover(dir).context("Validation failed")?;
        let options = LoadOptions {
            on_error: LoadErrorPolicy::Abort,
            parse: ParseOptions {
                unknown_changes: config.unknown_changes,
            },
        };
        let loaded = load_all(dir, &files, &options).context("Validation failed")?;
        println!("OK: {} migration file(s) load cleanly", loaded.migrations.len());
        return Ok(());
    }

    let db = common::open_database_for_read(&config)?;
    let plan = Migrator::new(config, &db)
        .plan()
        .map_err(|err| engine_failure(err, "Validation failed"))?;

    println!(
        "OK: {} migration(s), {} applied, {} pending",
        plan.applied.len() + plan.pending.len(),
        plan.applied.len(),
        plan.pending.len()
    );
    Ok(())
}
