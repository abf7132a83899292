//! Orchestration of a full migration run.
//!
//! A run moves through [`MigratorState`] in order: scan the migrations
//! directory, load every file, make sure the log table exists, take the run
//! lock, reconcile against the log, then execute what is pending. Any failure
//! leaves the migrator `Halted`; an integrity failure halts before anything
//! is executed.

use crate::error::{EngineError, EngineResult};
use crate::executor::Executor;
use crate::lock::{self, LockGuard};
use cairn_core::{
    discover, load_all, Config, LoadOptions, LoadOutcome, MigrationLog, ParseOptions, Plan,
    SkippedFile,
};
use cairn_db::Database;
use std::fmt;
use std::path::Path;

/// Lifecycle of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigratorState {
    Idle,
    Scanned,
    Loaded,
    LogTableEnsured,
    Reconciled,
    Executing,
    Done,
    Halted,
}

impl fmt::Display for MigratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigratorState::Idle => "idle",
            MigratorState::Scanned => "scanned",
            MigratorState::Loaded => "loaded",
            MigratorState::LogTableEnsured => "log table ensured",
            MigratorState::Reconciled => "reconciled",
            MigratorState::Executing => "executing",
            MigratorState::Done => "done",
            MigratorState::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// The log table did not exist and was created by this run
    pub log_table_created: bool,

    /// Log rows of migrations applied by earlier runs
    pub applied: Vec<MigrationLog>,

    /// Log rows written by this run, in execution order
    pub executed: Vec<MigrationLog>,

    /// Files dropped by the `skip` load policy
    pub skipped_files: Vec<SkippedFile>,

    pub final_state: MigratorState,
}

/// Callback invoked with the reconciled plan before anything is executed.
type ReconciledHook<'a> = Box<dyn FnMut(&Plan) + 'a>;

/// Runs migrations from `config.migrations_dir` against a database.
///
/// `migrations_dir` is used as given; callers resolve it against the
/// project root first.
pub struct Migrator<'a> {
    config: Config,
    db: &'a dyn Database,
    state: MigratorState,
    skipped: Vec<SkippedFile>,
    on_reconciled: Option<ReconciledHook<'a>>,
}

impl<'a> Migrator<'a> {
    pub fn new(config: Config, db: &'a dyn Database) -> Self {
        Self {
            config,
            db,
            state: MigratorState::Idle,
            skipped: Vec::new(),
            on_reconciled: None,
        }
    }

    /// Register a callback that sees the plan once reconciliation succeeds.
    ///
    /// It runs before the first pending migration, so output it produces
    /// survives a later execution failure.
    pub fn on_reconciled(mut self, hook: impl FnMut(&Plan) + 'a) -> Self {
        self.on_reconciled = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> MigratorState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Files skipped by the last scan under the `skip` load policy.
    pub fn skipped_files(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Apply every pending migration.
    pub fn execute(&mut self) -> EngineResult<MigrationReport> {
        let result = self.run();
        if let Err(err) = &result {
            log::debug!("Migration run halted in state '{}': {err}", self.state);
            self.state = MigratorState::Halted;
        }
        result
    }

    /// Reconcile without creating the log table or executing anything.
    ///
    /// A missing log table reads as an empty log.
    pub fn plan(&mut self) -> EngineResult<Plan> {
        let result = self.build_plan();
        if result.is_err() {
            self.state = MigratorState::Halted;
        }
        result
    }

    /// Clear a run lock left behind by another process.
    pub fn force_unlock(&self) -> EngineResult<()> {
        lock::force_unlock(self.db, &self.config.lock_table)
    }

    fn run(&mut self) -> EngineResult<MigrationReport> {
        let loaded = self.scan_and_load()?;

        let log_table_created = self
            .db
            .ensure_log_table(&self.config.log_table)
            .map_err(|source| EngineError::LogStorage {
                context: format!("creating {}", self.config.log_table),
                source,
            })?;
        self.state = MigratorState::LogTableEnsured;

        let _guard = if self.config.lock {
            Some(LockGuard::acquire(self.db, &self.config.lock_table)?)
        } else {
            None
        };

        let logs = self.read_log()?;
        let plan = Plan::build(loaded.migrations, logs)?;
        self.state = MigratorState::Reconciled;

        for applied in &plan.applied {
            log::info!("Already applied: {}", applied.audit_line());
        }
        if let Some(hook) = self.on_reconciled.as_mut() {
            hook(&plan);
        }

        self.state = MigratorState::Executing;
        let executor = Executor::new(self.db, &self.config);
        let mut executed = Vec::with_capacity(plan.pending.len());
        for migration in &plan.pending {
            executed.push(executor.apply(migration)?);
        }
        self.state = MigratorState::Done;

        log::info!(
            "Migration run complete: {} already applied, {} executed",
            plan.applied.len(),
            executed.len()
        );

        Ok(MigrationReport {
            log_table_created,
            applied: plan.applied,
            executed,
            skipped_files: loaded.skipped,
            final_state: self.state,
        })
    }

    fn build_plan(&mut self) -> EngineResult<Plan> {
        let loaded = self.scan_and_load()?;
        let logs = if self.db.table_exists(&self.config.log_table)? {
            self.read_log()?
        } else {
            Vec::new()
        };
        let plan = Plan::build(loaded.migrations, logs)?;
        self.state = MigratorState::Reconciled;
        Ok(plan)
    }

    fn scan_and_load(&mut self) -> EngineResult<LoadOutcome> {
        let dir = Path::new(&self.config.migrations_dir);
        let files = discover(dir)?;
        self.state = MigratorState::Scanned;
        log::debug!("Discovered {} migration file(s) in {}", files.len(), dir.display());

        let options = LoadOptions {
            on_error: self.config.on_load_error,
            parse: ParseOptions {
                unknown_changes: self.config.unknown_changes,
            },
        };
        let outcome = load_all(dir, &files, &options)?;
        self.skipped = outcome.skipped.clone();
        self.state = MigratorState::Loaded;
        Ok(outcome)
    }

    fn read_log(&self) -> EngineResult<Vec<MigrationLog>> {
        self.db
            .read_log(&self.config.log_table)
            .map_err(|source| EngineError::LogStorage {
                context: format!("reading {}", self.config.log_table),
                source,
            })
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
