use super::*;
use crate::testing::{Call, RecordingDb};
use cairn_core::{compute_checksum, LoadErrorPolicy, ReconcileError};
use chrono::{TimeZone, Utc};
use std::fs;
use tempfile::TempDir;

// ── Helpers ────────────────────────────────────────────────────────────

const CREATE_USERS: &str = r#"
changes:
  - create_table:
      name: users
      columns:
        - { name: id, type: integer, primary_key: true }
        - { name: email, type: string, size: 120 }
"#;

const SEED_USERS: &str = r#"
up:
  - insert:
      table: users
      rows:
        - { id: 1, email: a@example.com }
"#;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn config_for(dir: &TempDir) -> Config {
    Config {
        migrations_dir: dir.path().display().to_string(),
        ..Config::default()
    }
}

fn log_row(name: &str, content: &str) -> MigrationLog {
    MigrationLog::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        name,
        compute_checksum(content.as_bytes()),
    )
}

// ── Fresh and repeated runs ────────────────────────────────────────────

#[test]
fn test_fresh_run_applies_everything_in_order() {
    let dir = project(&[("002-seed.yaml", SEED_USERS), ("001-users.yaml", CREATE_USERS)]);
    let db = RecordingDb::new();
    let mut migrator = Migrator::new(config_for(&dir), &db);
    assert_eq!(migrator.state(), MigratorState::Idle);

    let report = migrator.execute().unwrap();

    assert!(report.log_table_created);
    assert!(report.applied.is_empty());
    let executed: Vec<_> = report.executed.iter().map(|l| l.filename.as_str()).collect();
    assert_eq!(executed, vec!["001-users.yaml", "002-seed.yaml"]);
    assert_eq!(report.final_state, MigratorState::Done);
    assert_eq!(migrator.state(), MigratorState::Done);
    assert_eq!(db.logs().len(), 2);
    assert_eq!(db.lock_owner(), None);
}

#[test]
fn test_rerun_is_a_no_op() {
    let dir = project(&[("001-users.yaml", CREATE_USERS)]);
    let db = RecordingDb::new().with_logs(vec![log_row("001-users.yaml", CREATE_USERS)]);

    let report = Migrator::new(config_for(&dir), &db).execute().unwrap();

    assert!(!report.log_table_created);
    assert!(report.executed.is_empty());
    let audit: Vec<_> = report.applied.iter().map(MigrationLog::audit_line).collect();
    assert_eq!(audit, vec!["2024-01-01 00:00:00  001-users.yaml"]);
    assert!(db.mutations().is_empty());
    assert_eq!(db.logs().len(), 1);
}

#[test]
fn test_empty_directory_only_creates_log_table() {
    let dir = project(&[]);
    let db = RecordingDb::new();

    let report = Migrator::new(config_for(&dir), &db).execute().unwrap();

    assert!(report.log_table_created);
    assert!(report.executed.is_empty());
    assert!(db.mutations().is_empty());
}

// ── Integrity ──────────────────────────────────────────────────────────

#[test]
fn test_edited_file_halts_before_execution() {
    let dir = project(&[("001-users.yaml", CREATE_USERS), ("002-seed.yaml", SEED_USERS)]);
    let original = "changes: []\n";
    let db = RecordingDb::new().with_logs(vec![log_row("001-users.yaml", original)]);
    let mut migrator = Migrator::new(config_for(&dir), &db);

    let err = migrator.execute().unwrap_err();

    match err {
        EngineError::Integrity(ReconcileError::ChecksumMismatch {
            filename,
            expected,
            actual,
        }) => {
            assert_eq!(filename, "001-users.yaml");
            assert_eq!(expected, compute_checksum(original.as_bytes()));
            assert_eq!(actual, compute_checksum(CREATE_USERS.as_bytes()));
        }
        other => panic!("expected ChecksumMismatch, got {other:?}"),
    }
    assert_eq!(migrator.state(), MigratorState::Halted);
    assert!(db.mutations().is_empty());
    assert_eq!(db.lock_owner(), None);
}

#[test]
fn test_missing_file_halts_before_execution() {
    let dir = project(&[("002-seed.yaml", SEED_USERS)]);
    let db = RecordingDb::new().with_logs(vec![log_row("001-users.yaml", CREATE_USERS)]);

    let err = Migrator::new(config_for(&dir), &db).execute().unwrap_err();

    assert!(matches!(
        err,
        EngineError::Integrity(ReconcileError::MissingMigrationFile { ref filename })
            if filename == "001-users.yaml"
    ));
    assert!(db.mutations().is_empty());
}

// ── Loading ────────────────────────────────────────────────────────────

#[test]
fn test_load_failure_aborts_before_touching_database() {
    let dir = project(&[("001-users.yaml", CREATE_USERS), ("002-bad.yaml", "up: [1, 2")]);
    let db = RecordingDb::new();
    let mut migrator = Migrator::new(config_for(&dir), &db);

    let err = migrator.execute().unwrap_err();

    assert!(matches!(err, EngineError::Core(_)));
    assert!(err.to_string().contains("002-bad.yaml"));
    assert!(db.calls().is_empty());
    assert_eq!(migrator.state(), MigratorState::Halted);
}

#[test]
fn test_overlong_filename_fails_load_without_database_calls() {
    let long_name = format!("001-{}.yaml", "x".repeat(120));
    let dir = project(&[(long_name.as_str(), CREATE_USERS)]);
    let db = RecordingDb::new();
    let config = Config {
        transactional: false,
        ..config_for(&dir)
    };
    let mut migrator = Migrator::new(config, &db);

    let err = migrator.execute().unwrap_err();

    assert!(matches!(err, EngineError::Core(_)));
    assert!(err.to_string().contains(&long_name));
    assert!(db.calls().is_empty());
    assert_eq!(migrator.state(), MigratorState::Halted);
}

#[test]
fn test_skip_policy_continues_and_reports() {
    let dir = project(&[("001-users.yaml", CREATE_USERS), ("002-bad.yaml", "up: [1, 2")]);
    let db = RecordingDb::new();
    let config = Config {
        on_load_error: LoadErrorPolicy::Skip,
        ..config_for(&dir)
    };

    let report = Migrator::new(config, &db).execute().unwrap();

    assert_eq!(report.executed.len(), 1);
    assert_eq!(report.skipped_files.len(), 1);
    assert_eq!(report.skipped_files[0].filename, "002-bad.yaml");
}

#[test]
fn test_missing_directory_is_core_error() {
    let dir = project(&[]);
    let config = Config {
        migrations_dir: dir.path().join("nope").display().to_string(),
        ..Config::default()
    };
    let db = RecordingDb::new();

    let err = Migrator::new(config, &db).execute().unwrap_err();
    assert!(matches!(err, EngineError::Core(_)));
}

// ── Execution failures and locking ─────────────────────────────────────

#[test]
fn test_execution_failure_halts_and_releases_lock() {
    let dir = project(&[("001-users.yaml", CREATE_USERS), ("002-seed.yaml", SEED_USERS)]);
    let db = RecordingDb::new().failing_inserts_into("users");
    let mut migrator = Migrator::new(config_for(&dir), &db);

    let err = migrator.execute().unwrap_err();

    assert!(matches!(err, EngineError::DataApply { .. }));
    assert_eq!(migrator.state(), MigratorState::Halted);
    let logged: Vec<_> = db.logs().into_iter().map(|l| l.filename).collect();
    assert_eq!(logged, vec!["001-users.yaml"]);
    assert_eq!(db.calls().last(), Some(&Call::Unlock));
    assert_eq!(db.lock_owner(), None);
}

#[test]
fn test_reconciled_hook_runs_before_failing_execution() {
    let dir = project(&[("001-users.yaml", CREATE_USERS), ("002-seed.yaml", SEED_USERS)]);
    let db = RecordingDb::new()
        .with_logs(vec![log_row("001-users.yaml", CREATE_USERS)])
        .failing_inserts_into("users");
    let mut seen = Vec::new();

    let err = {
        let mut migrator = Migrator::new(config_for(&dir), &db).on_reconciled(|plan| {
            seen.push((
                plan.applied.iter().map(MigrationLog::audit_line).collect::<Vec<_>>(),
                db.mutations().len(),
            ));
        });
        migrator.execute().unwrap_err()
    };

    assert!(matches!(err, EngineError::DataApply { .. }));
    assert_eq!(
        seen,
        vec![(vec!["2024-01-01 00:00:00  001-users.yaml".to_string()], 0)]
    );
}

#[test]
fn test_reconciled_hook_is_skipped_on_integrity_failure() {
    let dir = project(&[("001-users.yaml", CREATE_USERS)]);
    let db = RecordingDb::new().with_logs(vec![log_row("001-users.yaml", "changes: []\n")]);
    let mut calls = 0;

    let result = Migrator::new(config_for(&dir), &db)
        .on_reconciled(|_| calls += 1)
        .execute();

    assert!(matches!(result, Err(EngineError::Integrity(_))));
    assert_eq!(calls, 0);
}

#[test]
fn test_held_lock_fails_fast() {
    let dir = project(&[("001-users.yaml", CREATE_USERS)]);
    let db = RecordingDb::new().with_lock_held_by("other:1:cafebabe");

    let err = Migrator::new(config_for(&dir), &db).execute().unwrap_err();

    assert!(matches!(err, EngineError::LockHeld { ref owner, .. } if owner == "other:1:cafebabe"));
    assert!(db.mutations().is_empty());
    assert_eq!(db.lock_owner().as_deref(), Some("other:1:cafebabe"));
}

#[test]
fn test_lock_can_be_disabled() {
    let dir = project(&[("001-users.yaml", CREATE_USERS)]);
    let db = RecordingDb::new().with_lock_held_by("other:1:cafebabe");
    let config = Config {
        lock: false,
        ..config_for(&dir)
    };

    Migrator::new(config, &db).execute().unwrap();
    assert!(!db.calls().contains(&Call::TryLock));
}

#[test]
fn test_force_unlock_clears_any_owner() {
    let dir = project(&[]);
    let db = RecordingDb::new().with_lock_held_by("other:1:cafebabe");

    Migrator::new(config_for(&dir), &db).force_unlock().unwrap();
    assert_eq!(db.lock_owner(), None);
}

// ── Plan ───────────────────────────────────────────────────────────────

#[test]
fn test_plan_without_log_table_is_read_only() {
    let dir = project(&[("001-users.yaml", CREATE_USERS)]);
    let db = RecordingDb::new();
    let mut migrator = Migrator::new(config_for(&dir), &db);

    let plan = migrator.plan().unwrap();

    assert!(plan.applied.is_empty());
    assert_eq!(plan.pending.len(), 1);
    assert_eq!(migrator.state(), MigratorState::Reconciled);
    assert!(db.calls().is_empty());
}

#[test]
fn test_plan_reports_applied_and_pending() {
    let dir = project(&[("001-users.yaml", CREATE_USERS), ("002-seed.yaml", SEED_USERS)]);
    let db = RecordingDb::new().with_logs(vec![log_row("001-users.yaml", CREATE_USERS)]);

    let plan = Migrator::new(config_for(&dir), &db).plan().unwrap();

    assert_eq!(plan.applied.len(), 1);
    assert_eq!(plan.pending[0].filename(), "002-seed.yaml");
    assert_eq!(db.calls(), vec![Call::ReadLog]);
}
