use std::sync::Arc;

use mongodb::Database;

use crate::config::{AppConfig, StoreBackend};
use crate::directory::MongoUserDirectory;
use crate::errors::Result;
use crate::services::notify::Notifier;
use crate::services::recovery_service::RecoveryService;
use crate::store::{CredentialStore, MemoryCredentialStore, MongoCredentialStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub recovery: Arc<RecoveryService>,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = match config.store_backend {
            StoreBackend::Mongo => Arc::new(MongoCredentialStore::new(db.clone())),
            StoreBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        };

        let directory = Arc::new(MongoUserDirectory::new(db.clone()));
        let notifier = Notifier::from_config(config)?;
        let recovery = Arc::new(RecoveryService::new(directory, store, notifier, config));

        Ok(AppState { db, recovery })
    }
}
