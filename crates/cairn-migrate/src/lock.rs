//! Advisory run lock held for the duration of a migration run.

use crate::error::{EngineError, EngineResult};
use cairn_db::{Database, LockAttempt};

/// Holds the run lock; releases it when dropped.
pub struct LockGuard<'a> {
    db: &'a dyn Database,
    table: String,
    owner: String,
}

impl<'a> LockGuard<'a> {
    /// Take the lock or fail with [`EngineError::LockHeld`].
    pub fn acquire(db: &'a dyn Database, table: &str) -> EngineResult<Self> {
        let owner = lock_owner();
        match db.try_lock(table, &owner)? {
            LockAttempt::Acquired => {
                log::debug!("Acquired run lock in {table} as {owner}");
                Ok(Self {
                    db,
                    table: table.to_string(),
                    owner,
                })
            }
            LockAttempt::Held { owner, since } => Err(EngineError::LockHeld { owner, since }),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        match self.db.unlock(&self.table, Some(&self.owner)) {
            Ok(()) => log::debug!("Released run lock in {}", self.table),
            Err(e) => log::warn!(
                "Failed to release run lock in {} (owner {}): {e}",
                self.table,
                self.owner
            ),
        }
    }
}

/// Clear the lock regardless of owner.
pub fn force_unlock(db: &dyn Database, table: &str) -> EngineResult<()> {
    log::warn!("Force-clearing run lock in {table}");
    db.unlock(table, None)?;
    Ok(())
}

/// `host:pid:nonce`, unique per run.
fn lock_owner() -> String {
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string());
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{host}:{}:{}", std::process::id(), &nonce[..8])
}
