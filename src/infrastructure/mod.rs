//! Infrastructure layer: SQLite storage, transactions, locks and DI container

pub mod database;
pub mod di;
pub mod error;
pub mod executor;
pub mod lock;
pub mod schema;

pub use database::{Database, TransactionGuard};
pub use error::{InfraError, InfraResult};
pub use executor::TransactionalExecutor;
pub use lock::NamedLock;
