//! User storage implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use surrealdb::{Connection, RecordId};

use super::USER_TABLE;
use super::base::SurrealUserStore;
use crate::models::{EdgeField, UserId, UserRecord};
use crate::storage::errors::StorageError;
use crate::storage::traits::UserStore;

/// Internal representation of a user record for SurrealDB
///
/// The id is read from the stored `user_id` field rather than the record
/// key, whose display form escapes some characters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SurrealUser {
    user_id: String,
    display_name: Option<String>,
    avatar: Option<String>,
    #[serde(default)]
    friends: Vec<String>,
    #[serde(default)]
    pending: Vec<String>,
    #[serde(default)]
    requested: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Struct for creating users (timestamps are set by the schema defaults)
#[derive(Debug, Clone, serde::Serialize)]
struct CreateUser {
    user_id: String,
    display_name: Option<String>,
    avatar: Option<String>,
    friends: Vec<String>,
    pending: Vec<String>,
    requested: Vec<String>,
}

fn record_id(id: &UserId) -> RecordId {
    RecordId::from((USER_TABLE, id.as_str()))
}

fn to_set(values: Vec<String>) -> Result<BTreeSet<UserId>, StorageError> {
    values
        .into_iter()
        .map(|value| {
            UserId::new(value).map_err(|e| StorageError::Serialization(e.to_string()))
        })
        .collect()
}

impl TryFrom<SurrealUser> for UserRecord {
    type Error = StorageError;

    fn try_from(user: SurrealUser) -> Result<Self, Self::Error> {
        let id = UserId::new(user.user_id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(Self {
            id,
            display_name: user.display_name,
            avatar: user.avatar,
            friends: to_set(user.friends)?,
            pending: to_set(user.pending)?,
            requested: to_set(user.requested)?,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }
}

fn strings(set: &BTreeSet<UserId>) -> Vec<String> {
    set.iter().map(|id| id.as_str().to_string()).collect()
}

impl<C> SurrealUserStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    /// Run a single-record set update. `expression` rewrites the named field
    /// from its current value and `$value`.
    async fn update_set(
        &self,
        id: &UserId,
        field: EdgeField,
        expression: &str,
        value: &UserId,
    ) -> Result<(), StorageError> {
        // Field names come from EdgeField, never from user input
        let query = format!(
            "UPDATE $record SET {field} = {expression}, updated_at = time::now()",
            field = field.as_str(),
            expression = expression,
        );

        let mut response = self
            .client
            .query(query)
            .bind(("record", record_id(id)))
            .bind(("value", value.as_str().to_string()))
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to update {}: {}", field, e)))?;

        let updated: Option<SurrealUser> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to update {}: {}", field, e)))?;

        match updated {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("User '{}' not found", id))),
        }
    }
}

#[async_trait]
impl<C> UserStore for SurrealUserStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StorageError> {
        if self.get_user(&user.id).await?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "User '{}' already exists",
                user.id
            )));
        }

        let create_user = CreateUser {
            user_id: user.id.as_str().to_string(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            friends: strings(&user.friends),
            pending: strings(&user.pending),
            requested: strings(&user.requested),
        };

        let created: Option<SurrealUser> = self
            .client
            .create(record_id(&user.id))
            .content(create_user)
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("already exists") {
                    StorageError::AlreadyExists(format!("User '{}' already exists", user.id))
                } else {
                    StorageError::Query(format!("Failed to create user: {}", message))
                }
            })?;

        created
            .ok_or_else(|| StorageError::Internal("No user created".to_string()))?
            .try_into()
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        let user: Option<SurrealUser> = self
            .client
            .select(record_id(id))
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to get user: {}", e)))?;

        user.map(UserRecord::try_from).transpose()
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<RecordId> = ids.iter().map(record_id).collect();
        let mut response = self
            .client
            .query("SELECT * FROM $records")
            .bind(("records", records))
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to get users: {}", e)))?;

        let users: Vec<SurrealUser> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to get users: {}", e)))?;

        let mut by_id: HashMap<UserId, UserRecord> = HashMap::with_capacity(users.len());
        for user in users {
            let record = UserRecord::try_from(user)?;
            by_id.insert(record.id.clone(), record);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn add_to_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        let expression = format!("array::union({}, [$value])", field.as_str());
        self.update_set(id, field, &expression, value).await
    }

    async fn remove_from_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        let expression = format!("array::complement({}, [$value])", field.as_str());
        self.update_set(id, field, &expression, value).await
    }
}

