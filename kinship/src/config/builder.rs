//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for creating KinshipConfig instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: KinshipConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: KinshipConfig::default(),
        }
    }

    /// Set the base data directory.
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.storage.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Select the storage engine.
    pub fn with_storage_engine(mut self, engine: StorageEngine) -> Self {
        self.config.storage.engine = engine;
        self
    }

    /// Use the plain in-memory store (good for testing)
    pub fn with_memory_storage(self) -> Self {
        self.with_storage_engine(StorageEngine::Memory)
    }

    /// Use SurrealDB's in-memory engine
    pub fn with_surreal_memory_storage(self) -> Self {
        self.with_storage_engine(StorageEngine::SurrealMemory)
    }

    /// Use persistent SurrealDB storage under the data directory
    pub fn with_persistent_storage(self) -> Self {
        self.with_storage_engine(StorageEngine::RocksDb)
    }

    /// Set the SurrealDB namespace and database.
    pub fn with_namespace(
        mut self,
        namespace: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        self.config.storage.namespace = namespace.into();
        self.config.storage.database = database.into();
        self
    }

    /// Toggle reconciliation before listings.
    pub fn with_reconcile_on_list(mut self, enabled: bool) -> Self {
        self.config.reconciliation.reconcile_on_list = enabled;
        self
    }

    /// Set how many times a failed mirror write is retried, and the base delay.
    pub fn with_mirror_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.config.reconciliation.mirror_retry_attempts = attempts;
        self.config.reconciliation.mirror_retry_backoff = backoff;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Set the log file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Create a configuration for development with an in-memory database.
    ///
    /// Uses SurrealDB's memory engine so queries run through the same code
    /// path as production, with debug-level logging.
    pub fn development() -> Self {
        Self::new()
            .with_surreal_memory_storage()
            .with_log_level(LogLevel::Debug)
    }

    /// Create a configuration for testing.
    ///
    /// Plain in-memory storage and near-instant mirror retries.
    pub fn testing() -> Self {
        Self::new()
            .with_memory_storage()
            .with_data_dir(PathBuf::from("./test_data"))
            .with_mirror_retries(2, Duration::from_millis(1))
            .with_log_level(LogLevel::Debug)
    }

    /// Create a production-ready configuration with persistent storage.
    pub fn production() -> Self {
        Self::new()
            .with_persistent_storage()
            .with_log_level(LogLevel::Info)
    }

    /// Build the configuration, validating it in the process.
    pub fn build(self) -> Result<KinshipConfig> {
        validation::validate_config(&self.config)?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
