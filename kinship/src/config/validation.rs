//! Configuration validation utilities.
//!
//! This module provides validation functions for configuration values.

use super::ConfigError;
use super::models::*;

/// Upper bound for mirror write retries
const MAX_MIRROR_RETRY_ATTEMPTS: u32 = 10;

/// Validate the entire configuration.
pub fn validate_config(config: &KinshipConfig) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_reconciliation_config(&config.reconciliation)?;

    Ok(())
}

/// Validate storage configuration.
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.engine == StorageEngine::RocksDb && config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Data directory cannot be empty".to_string(),
        ));
    }

    if config.namespace.is_empty() {
        return Err(ConfigError::ValidationError(
            "SurrealDB namespace cannot be empty".to_string(),
        ));
    }
    if config.database.is_empty() {
        return Err(ConfigError::ValidationError(
            "SurrealDB database cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_reconciliation_config(config: &ReconciliationConfig) -> Result<(), ConfigError> {
    if config.mirror_retry_attempts > MAX_MIRROR_RETRY_ATTEMPTS {
        return Err(ConfigError::ValidationError(format!(
            "Mirror retry attempts must be at most {} (got {})",
            MAX_MIRROR_RETRY_ATTEMPTS, config.mirror_retry_attempts
        )));
    }

    Ok(())
}
