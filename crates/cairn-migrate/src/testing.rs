//! In-memory `Database` that records every call, for engine unit tests.

use cairn_core::{CellValue, MigrationLog, TableDefinition};
use cairn_db::{Database, DbError, DbResult, LockAttempt};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateTable(String),
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<CellValue>,
    },
    EnsureLogTable,
    ReadLog,
    AppendLog(String),
    Begin,
    Commit,
    Rollback,
    TryLock,
    Unlock,
}

#[derive(Debug, Default, Clone)]
struct State {
    tables: BTreeSet<String>,
    logs: Vec<MigrationLog>,
    log_table: bool,
    lock_owner: Option<String>,
}

#[derive(Default)]
pub(crate) struct RecordingDb {
    calls: Mutex<Vec<Call>>,
    state: Mutex<State>,
    snapshot: Mutex<Option<State>>,
    transactional: bool,
    fail_inserts_into: Option<String>,
    fail_commits: bool,
}

impl RecordingDb {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn transactional() -> Self {
        Self {
            transactional: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_inserts_into(mut self, table: &str) -> Self {
        self.fail_inserts_into = Some(table.to_string());
        self
    }

    pub(crate) fn failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    pub(crate) fn with_logs(self, logs: Vec<MigrationLog>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.log_table = true;
            state.logs = logs;
        }
        self
    }

    pub(crate) fn with_lock_held_by(self, owner: &str) -> Self {
        self.state.lock().unwrap().lock_owner = Some(owner.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that change user tables or the log.
    pub(crate) fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::CreateTable(_) | Call::Insert { .. } | Call::AppendLog(_)
                )
            })
            .collect()
    }

    pub(crate) fn tables(&self) -> Vec<String> {
        self.state.lock().unwrap().tables.iter().cloned().collect()
    }

    pub(crate) fn logs(&self) -> Vec<MigrationLog> {
        self.state.lock().unwrap().logs.clone()
    }

    pub(crate) fn lock_owner(&self) -> Option<String> {
        self.state.lock().unwrap().lock_owner.clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Database for RecordingDb {
    fn db_type(&self) -> &'static str {
        "recording"
    }

    fn table_exists(&self, name: &str) -> DbResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.tables.contains(name) || (state.log_table && name == "_cairn_migrations"))
    }

    fn create_table(&self, definition: &TableDefinition) -> DbResult<()> {
        self.record(Call::CreateTable(definition.name.clone()));
        let mut state = self.state.lock().unwrap();
        if !state.tables.insert(definition.name.clone()) {
            return Err(DbError::TableExists(definition.name.clone()));
        }
        Ok(())
    }

    fn insert(&self, table: &str, columns: &[String], values: &[CellValue]) -> DbResult<()> {
        self.record(Call::Insert {
            table: table.to_string(),
            columns: columns.to_vec(),
            values: values.to_vec(),
        });
        if self.fail_inserts_into.as_deref() == Some(table) {
            return Err(DbError::ExecutionError(format!("insert into {table} refused")));
        }
        Ok(())
    }

    fn ensure_log_table(&self, _table: &str) -> DbResult<bool> {
        self.record(Call::EnsureLogTable);
        let mut state = self.state.lock().unwrap();
        let created = !state.log_table;
        state.log_table = true;
        Ok(created)
    }

    fn read_log(&self, table: &str) -> DbResult<Vec<MigrationLog>> {
        self.record(Call::ReadLog);
        let state = self.state.lock().unwrap();
        if !state.log_table {
            return Err(DbError::TableNotFound(table.to_string()));
        }
        Ok(state.logs.clone())
    }

    fn append_log(&self, _table: &str, filename: &str, checksum: &str) -> DbResult<MigrationLog> {
        self.record(Call::AppendLog(filename.to_string()));
        let log = MigrationLog::new(Utc::now(), filename, checksum);
        self.state.lock().unwrap().logs.push(log.clone());
        Ok(log)
    }

    fn supports_transactional_ddl(&self) -> bool {
        self.transactional
    }

    fn begin(&self) -> DbResult<()> {
        self.record(Call::Begin);
        let state = self.state.lock().unwrap().clone();
        *self.snapshot.lock().unwrap() = Some(state);
        Ok(())
    }

    fn commit(&self) -> DbResult<()> {
        self.record(Call::Commit);
        if self.fail_commits {
            return Err(DbError::TransactionError("COMMIT failed".into()));
        }
        self.snapshot.lock().unwrap().take();
        Ok(())
    }

    fn rollback(&self) -> DbResult<()> {
        self.record(Call::Rollback);
        match self.snapshot.lock().unwrap().take() {
            Some(state) => {
                *self.state.lock().unwrap() = state;
                Ok(())
            }
            None => Err(DbError::TransactionError("no transaction".into())),
        }
    }

    fn try_lock(&self, _lock_table: &str, owner: &str) -> DbResult<LockAttempt> {
        self.record(Call::TryLock);
        let mut state = self.state.lock().unwrap();
        match &state.lock_owner {
            Some(holder) => Ok(LockAttempt::Held {
                owner: holder.clone(),
                since: "earlier".to_string(),
            }),
            None => {
                state.lock_owner = Some(owner.to_string());
                Ok(LockAttempt::Acquired)
            }
        }
    }

    fn unlock(&self, _lock_table: &str, owner: Option<&str>) -> DbResult<()> {
        self.record(Call::Unlock);
        let mut state = self.state.lock().unwrap();
        if owner.is_none() || state.lock_owner.as_deref() == owner {
            state.lock_owner = None;
        }
        Ok(())
    }
}
