//! Storage abstractions and implementations
//!
//! The relationship engine only talks to the [`UserStore`] trait, which
//! exposes point lookups and single-record set mutations.
//!
//! ## Storage Implementations
//!
//! - **Memory**: `DashMap`-backed store for tests and single-process use
//! - **SurrealDB**: embedded in-memory or RocksDB engine, one `person` table

pub mod errors;
pub mod memory;
#[cfg(feature = "surrealdb-embedded")]
pub mod surreal;
pub mod traits;

use std::sync::Arc;

use crate::config::{StorageConfig, StorageEngine};

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryUserStore;
#[cfg(feature = "surrealdb-embedded")]
pub use surreal::{SurrealStoreConfig, SurrealUserStore};
pub use traits::{BaseStore, UserStore};

/// Create the user store selected by the configuration.
pub async fn create_user_store(
    config: &StorageConfig,
) -> Result<Arc<dyn UserStore>, StorageError> {
    match config.engine {
        StorageEngine::Memory => {
            tracing::info!("Creating in-memory user store");
            Ok(Arc::new(MemoryUserStore::new()))
        }
        #[cfg(feature = "surrealdb-embedded")]
        StorageEngine::SurrealMemory => {
            tracing::info!("Creating SurrealDB user store with in-memory engine");
            let client = surrealdb::Surreal::new::<surrealdb::engine::local::Mem>(())
                .await
                .map_err(|e| {
                    StorageError::Connection(format!("Failed to create memory client: {}", e))
                })?;
            let store = SurrealUserStore::new(client, surreal_config(config)).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "surrealdb-embedded")]
        StorageEngine::RocksDb => {
            let path = config.rocksdb_path();
            tracing::info!(
                "Creating SurrealDB user store with RocksDB engine at {}",
                path.display()
            );
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let connection = path.to_string_lossy().to_string();
            let client = surrealdb::Surreal::new::<surrealdb::engine::local::RocksDb>(&connection)
                .await
                .map_err(|e| {
                    StorageError::Connection(format!("Failed to create RocksDB client: {}", e))
                })?;
            let store = SurrealUserStore::new(client, surreal_config(config)).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "surrealdb-embedded"))]
        _ => Err(StorageError::Configuration(
            "SurrealDB engines require the 'surrealdb-embedded' feature".to_string(),
        )),
    }
}

#[cfg(feature = "surrealdb-embedded")]
fn surreal_config(config: &StorageConfig) -> SurrealStoreConfig {
    SurrealStoreConfig {
        namespace: config.namespace.clone(),
        database: config.database.clone(),
    }
}
