//! Transactional executor: runs actions inside a transaction scope and/or
//! under a named process-external lock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{instrument, warn};

use crate::infrastructure::database::Database;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::lock::NamedLock;

#[derive(Debug)]
pub struct TransactionalExecutor<'db> {
    db: &'db Database,
    lock_dir: PathBuf,
    lock_timeout: Duration,
}

impl<'db> TransactionalExecutor<'db> {
    pub fn new(db: &'db Database, lock_dir: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            db,
            lock_dir: lock_dir.into(),
            lock_timeout,
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Default timeout used by [`Self::run_in_transaction_with_lock`].
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Commits when `action` succeeds; rolls back and returns its error otherwise.
    pub fn run_in_transaction<T, E, F>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<InfraError>,
    {
        let tx = self.db.transaction()?;
        match action() {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Runs `action` while holding the lock `name`; the lock is released on
    /// every exit path.
    #[instrument(level = "debug", skip(self, action))]
    pub fn run_under_named_lock<T, E, F>(
        &self,
        name: &str,
        timeout: Duration,
        action: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<InfraError>,
    {
        let _lock = NamedLock::acquire(&self.lock_dir, name, timeout)?;
        action()
    }

    pub fn run_in_transaction_with_lock<T, E, F>(&self, name: &str, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<InfraError>,
    {
        self.run_under_named_lock(name, self.lock_timeout, || self.run_in_transaction(action))
    }
}
