//! Migrate command implementation

use anyhow::{Context, Result};
use cairn_core::{Plan, SkippedFile};
use cairn_migrate::{MigrationReport, Migrator};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{self, engine_failure};

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let db = common::open_database(&config)?;
    let mut migrator = Migrator::new(config, &db).on_reconciled(print_applied);

    if args.force_unlock {
        migrator
            .force_unlock()
            .context("Failed to clear the run lock")?;
        println!("Cleared run lock.");
    }

    let result = migrator.execute();
    print_skipped(migrator.skipped_files());
    let report = result.map_err(|err| engine_failure(err, "Migration failed"))?;
    print_report(&report);
    Ok(())
}

/// Audit trail of earlier runs, printed before anything is executed.
fn print_applied(plan: &Plan) {
    for log in &plan.applied {
        println!("{}", log.audit_line());
    }
}

fn print_skipped(skipped: &[SkippedFile]) {
    for file in skipped {
        eprintln!("  ! skipped {} - {}", file.filename, file.reason);
    }
}

fn print_report(report: &MigrationReport) {
    for log in &report.executed {
        println!("  ✓ {}", log.filename);
    }

    if report.executed.is_empty() {
        println!("Database is up to date ({} applied).", report.applied.len());
    } else {
        println!(
            "\nApplied {} migration(s); {} total.",
            report.executed.len(),
            report.applied.len() + report.executed.len()
        );
    }
}
