//! Base SurrealDB store: connection handling and housekeeping

use async_trait::async_trait;
use surrealdb::{Connection, Surreal};

use crate::storage::errors::StorageError;
use crate::storage::traits::BaseStore;

/// Namespace and database selection for the store
#[derive(Debug, Clone)]
pub struct SurrealStoreConfig {
    pub namespace: String,
    pub database: String,
}

impl Default for SurrealStoreConfig {
    fn default() -> Self {
        Self {
            namespace: "kinship".to_string(),
            database: "main".to_string(),
        }
    }
}

/// User store backed by a SurrealDB client
#[derive(Debug)]
pub struct SurrealUserStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    pub(crate) client: Surreal<C>,
    pub(crate) config: SurrealStoreConfig,
}

impl<C> SurrealUserStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    /// Select the namespace/database and make sure the schema exists.
    pub async fn new(client: Surreal<C>, config: SurrealStoreConfig) -> Result<Self, StorageError> {
        client
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StorageError::Connection(format!("Failed to set namespace/database: {}", e))
            })?;

        super::schema::initialize_schema(&client).await?;

        tracing::info!(
            namespace = %config.namespace,
            database = %config.database,
            "SurrealDB user store ready"
        );

        Ok(Self { client, config })
    }

    /// Get the underlying client for advanced operations
    pub fn client(&self) -> &Surreal<C> {
        &self.client
    }
}

#[async_trait]
impl<C> BaseStore for SurrealUserStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn health_check(&self) -> Result<bool, StorageError> {
        let _result = self
            .client
            .query("INFO FOR DB")
            .await
            .map_err(|e| StorageError::Connection(format!("Health check failed: {}", e)))?;

        Ok(true)
    }

    async fn get_metadata(&self) -> Result<serde_json::Value, StorageError> {
        Ok(serde_json::json!({
            "type": "surrealdb_user_store",
            "namespace": self.config.namespace,
            "database": self.config.database,
            "table": super::USER_TABLE,
        }))
    }

    async fn close(&self) -> Result<(), StorageError> {
        // SurrealDB connections are closed when the client is dropped
        Ok(())
    }
}
