//! In-memory user store for tests and single-process deployments

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::models::{EdgeField, UserId, UserRecord};
use crate::storage::errors::StorageError;
use crate::storage::traits::{BaseStore, UserStore};

/// User store backed by a `DashMap`.
///
/// Each mutation holds the shard lock for its record for the duration of
/// the set update, which serialises concurrent writers per record.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<UserId, UserRecord>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutate(
        &self,
        id: &UserId,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<(), StorageError> {
        let mut record = self
            .users
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("User '{}' not found", id)))?;
        apply(&mut record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl BaseStore for MemoryUserStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }

    async fn get_metadata(&self) -> Result<serde_json::Value, StorageError> {
        Ok(serde_json::json!({
            "type": "memory_user_store",
            "user_count": self.users.len()
        }))
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StorageError> {
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(format!(
                "User '{}' already exists",
                user.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.users.get(id).map(|record| record.value().clone()))
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|record| record.value().clone()))
            .collect())
    }

    async fn add_to_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        self.mutate(id, |record| {
            record.edges_mut(field).insert(value.clone());
        })
    }

    async fn remove_from_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        self.mutate(id, |record| {
            record.edges_mut(field).remove(value);
        })
    }
}
