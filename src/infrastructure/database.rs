//! SQLite database handle with nested transaction scopes.
//!
//! The handle is constructed once and lent to every service. Transaction
//! scopes nest: only the outermost scope issues `BEGIN`/`COMMIT`, and a
//! rollback in an inner scope turns the whole transaction rollback-only.

use std::cell::Cell;
use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, instrument, warn};

use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::schema::{self, ADJACENCY_TABLE, NESTED_SET_TABLE, NODE_TABLE};

pub struct Database {
    conn: Connection,
    transaction_level: Cell<u32>,
    rollback_only: Cell<bool>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .field("transaction_level", &self.transaction_level.get())
            .finish()
    }
}

impl Database {
    /// Opens (or creates) the database file and ensures the schema exists.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> InfraResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
        }
        let conn = Connection::open(path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("journal mode: {}", journal_mode);
        Self::init(conn)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> InfraResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> InfraResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn,
            transaction_level: Cell::new(0),
            rollback_only: Cell::new(false),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_level.get() > 0
    }

    /// Opens a transaction scope that rolls back when dropped uncommitted.
    pub fn transaction(&self) -> InfraResult<TransactionGuard<'_>> {
        self.begin()?;
        Ok(TransactionGuard {
            db: self,
            finished: false,
        })
    }

    pub fn begin(&self) -> InfraResult<()> {
        let level = self.transaction_level.get();
        if level == 0 {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
            self.rollback_only.set(false);
            debug!("transaction started");
        }
        self.transaction_level.set(level + 1);
        Ok(())
    }

    pub fn commit(&self) -> InfraResult<()> {
        let level = self.transaction_level.get();
        if level == 0 {
            return Err(InfraError::NoTransaction);
        }
        self.transaction_level.set(level - 1);
        if level > 1 {
            return Ok(());
        }

        if self.rollback_only.get() {
            self.conn.execute_batch("ROLLBACK")?;
            return Err(InfraError::RolledBack);
        }
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                warn!("rollback after failed commit failed: {}", rollback_err);
            }
            return Err(e.into());
        }
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(&self) -> InfraResult<()> {
        let level = self.transaction_level.get();
        if level == 0 {
            return Err(InfraError::NoTransaction);
        }
        self.transaction_level.set(level - 1);
        if level > 1 {
            self.rollback_only.set(true);
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Removes every node, edge and range row.
    #[instrument(level = "debug", skip(self))]
    pub fn clear_tree_data(&self) -> InfraResult<()> {
        let tx = self.transaction()?;
        for table in [NESTED_SET_TABLE, ADJACENCY_TABLE, NODE_TABLE] {
            self.conn.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()
    }
}

/// Scoped transaction; rolls back on drop unless committed.
pub struct TransactionGuard<'db> {
    db: &'db Database,
    finished: bool,
}

impl TransactionGuard<'_> {
    pub fn commit(mut self) -> InfraResult<()> {
        self.finished = true;
        self.db.commit()
    }

    pub fn rollback(mut self) -> InfraResult<()> {
        self.finished = true;
        self.db.rollback()
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.db.rollback() {
                warn!("rollback of abandoned transaction failed: {}", e);
            }
        }
    }
}
