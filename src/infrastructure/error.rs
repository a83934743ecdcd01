//! Infrastructure-level errors (database, filesystem, locks)

use thiserror::Error;

/// Errors raised by the storage backend and the transaction/lock machinery.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to get lock '{name}' in {timeout_secs} seconds")]
    LockTimeout { name: String, timeout_secs: u64 },

    #[error("cannot commit or roll back: there is no open transaction")]
    NoTransaction,

    #[error("transaction was rolled back by an inner scope")]
    RolledBack,
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
