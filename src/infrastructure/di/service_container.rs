//! Service container for dependency injection
//!
//! Owns the database handle and lends it to the tree services.

use std::sync::Arc;

use tracing::debug;

use crate::application::{
    AdjacencyListTreeService, ApplicationResult, NestedSetTreeService, StorageEngine,
    TreeService,
};
use crate::config::Settings;
use crate::infrastructure::database::Database;
use crate::infrastructure::executor::TransactionalExecutor;

/// Container holding settings and the single database handle.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    db: Database,
}

impl ServiceContainer {
    /// Opens the database named in `settings`.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        debug!("opening database {}", settings.database_path.display());
        let db = Database::open(&settings.database_path)?;
        Ok(Self::with_database(settings, db))
    }

    /// Create a service container around an already opened database (for testing).
    pub fn with_database(settings: Settings, db: Database) -> Self {
        Self {
            settings: Arc::new(settings),
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn adjacency_service(&self) -> AdjacencyListTreeService<'_> {
        AdjacencyListTreeService::with_batch_size(&self.db, self.settings.batch_size)
    }

    pub fn nested_set_service(&self) -> NestedSetTreeService<'_> {
        NestedSetTreeService::with_batch_size(&self.db, self.settings.batch_size)
    }

    /// Engine-agnostic service for `engine`.
    pub fn tree_service(&self, engine: StorageEngine) -> Box<dyn TreeService + '_> {
        match engine {
            StorageEngine::AdjacencyList => Box::new(self.adjacency_service()),
            StorageEngine::NestedSet => Box::new(self.nested_set_service()),
        }
    }

    pub fn executor(&self) -> TransactionalExecutor<'_> {
        TransactionalExecutor::new(
            &self.db,
            self.settings.lock_dir.clone(),
            self.settings.lock_timeout(),
        )
    }
}
