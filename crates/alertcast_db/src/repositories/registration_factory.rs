//! Factory for creating registration stores
//!
//! Picks the SQL store when a database is configured and the in-memory store
//! otherwise.

use crate::error::DbError;
use crate::repositories::registration_memory::InMemoryRegistrationStore;
use crate::repositories::registration_sql::SqlRegistrationStore;
use crate::repository::RegistrationStore;
use crate::{DbClient, RepositoryFactory};
use alertcast_config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct RegistrationStoreFactory;

impl RegistrationStoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Builds the registration store described by `config`.
    ///
    /// The SQL schema is created on first use.
    pub async fn from_app_config(
        &self,
        config: &AppConfig,
    ) -> Result<Arc<dyn RegistrationStore>, DbError> {
        match &config.database {
            Some(db_config) => {
                let client = DbClient::from_config(db_config).await?;
                let store = self.create_repository(client);
                store.init_schema().await?;
                info!("Using SQL registration store");
                Ok(Arc::new(store))
            }
            None => {
                warn!("No database configured; registrations are kept in memory only");
                Ok(Arc::new(InMemoryRegistrationStore::new()))
            }
        }
    }
}

impl RepositoryFactory<SqlRegistrationStore, DbClient> for RegistrationStoreFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlRegistrationStore {
        SqlRegistrationStore::new(db_client)
    }
}
