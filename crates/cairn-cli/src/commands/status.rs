//! Status command implementation

use anyhow::Result;
use cairn_migrate::Migrator;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{self, engine_failure};

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let db = common::open_database_for_read(&config)?;
    let mut migrator = Migrator::new(config, &db);

    let plan = migrator
        .plan()
        .map_err(|err| engine_failure(err, "Failed to read migration status"))?;

    println!("Applied ({}):", plan.applied.len());
    for log in &plan.applied {
        if args.checksums {
            println!("  {}  {}", log.audit_line(), log.checksum);
        } else {
            println!("  {}", log.audit_line());
        }
    }

    println!("Pending ({}):", plan.pending.len());
    for migration in &plan.pending {
        println!("  {}", migration.filename());
    }
    if plan.is_up_to_date() {
        println!("Database is up to date.");
    }

    for skipped in migrator.skipped_files() {
        println!("  ! skipped {} - {}", skipped.filename, skipped.reason);
    }

    Ok(())
}
