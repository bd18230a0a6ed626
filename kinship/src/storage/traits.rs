//! Trait definitions for the user store consumed by the relationship engine

use async_trait::async_trait;
use std::fmt::Debug;

use crate::models::{EdgeField, UserId, UserRecord};
use crate::storage::errors::StorageError;

/// Base trait for all storage implementations
#[async_trait]
pub trait BaseStore: Send + Sync + 'static + Debug {
    /// Check if the store is healthy and available
    async fn health_check(&self) -> std::result::Result<bool, StorageError>;

    /// Get metadata about the store
    async fn get_metadata(&self) -> std::result::Result<serde_json::Value, StorageError>;

    /// Close connections and release resources
    async fn close(&self) -> std::result::Result<(), StorageError>;
}

/// Narrow storage contract required by the relationship engine.
///
/// Every mutation is atomic on a single record and no method spans two
/// records; sequencing the pair of writes that makes up a relationship
/// change is the engine's job. Adding a present element or removing an
/// absent one succeeds without changing anything.
#[async_trait]
pub trait UserStore: BaseStore {
    /// Persist a new user record. Fails with `AlreadyExists` on id clash.
    async fn create_user(&self, user: UserRecord) -> std::result::Result<UserRecord, StorageError>;

    /// Get a user by id
    async fn get_user(&self, id: &UserId) -> std::result::Result<Option<UserRecord>, StorageError>;

    /// Batch lookup. Ids without a record are skipped; order follows `ids`.
    async fn get_users(&self, ids: &[UserId]) -> std::result::Result<Vec<UserRecord>, StorageError>;

    /// Add `value` to the named set on record `id`. Fails with `NotFound`
    /// if the record does not exist.
    async fn add_to_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> std::result::Result<(), StorageError>;

    /// Remove `value` from the named set on record `id`. Fails with
    /// `NotFound` if the record does not exist.
    async fn remove_from_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> std::result::Result<(), StorageError>;
}
