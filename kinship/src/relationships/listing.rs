//! Request and friend listings

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::reconcile::Reconciler;
use super::{RelationshipError, Result};
use crate::config::ReconciliationConfig;
use crate::models::{EdgeField, ListDirection, UserId, UserRecord, UserSummary};
use crate::storage::UserStore;

/// Projects a user's edge sets into display summaries.
#[derive(Debug, Clone)]
pub struct RequestListingService {
    store: Arc<dyn UserStore>,
    reconciler: Reconciler,
    config: ReconciliationConfig,
}

impl RequestListingService {
    pub fn new(
        store: Arc<dyn UserStore>,
        reconciler: Reconciler,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            store,
            reconciler,
            config,
        }
    }

    /// Requests the actor has sent or received, ordered by id.
    pub async fn list_requests(
        &self,
        actor: &UserId,
        direction: ListDirection,
    ) -> Result<Vec<UserSummary>> {
        let record = self.load_actor(actor).await?;
        self.summaries(actor, record.edges(direction.field())).await
    }

    /// The actor's friends, ordered by id.
    pub async fn list_friends(&self, actor: &UserId) -> Result<Vec<UserSummary>> {
        let record = self.load_actor(actor).await?;
        self.summaries(actor, record.edges(EdgeField::Friends)).await
    }

    async fn load_actor(&self, actor: &UserId) -> Result<UserRecord> {
        if self.config.reconcile_on_list {
            match self.reconciler.reconcile_user(actor).await {
                Ok(repairs) if !repairs.is_empty() => {
                    debug!(user = %actor, repairs = repairs.len(), "Reconciled before listing");
                }
                Ok(_) => {}
                Err(RelationshipError::NotFound(id)) if &id == actor => {
                    return Err(RelationshipError::Unauthorized(id));
                }
                Err(e) => return Err(e),
            }
        }

        self.store
            .get_user(actor)
            .await
            .map_err(|e| RelationshipError::from_store(e, actor))?
            .ok_or_else(|| RelationshipError::Unauthorized(actor.clone()))
    }

    async fn summaries(&self, actor: &UserId, ids: &BTreeSet<UserId>) -> Result<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<UserId> = ids.iter().cloned().collect();
        let records = self
            .store
            .get_users(&ids)
            .await
            .map_err(|e| RelationshipError::from_store(e, actor))?;

        if records.len() < ids.len() {
            warn!(
                user = %actor,
                missing = ids.len() - records.len(),
                "Skipping edges that reference missing users"
            );
        }

        let mut summaries: Vec<UserSummary> = records.iter().map(UserSummary::from).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}
