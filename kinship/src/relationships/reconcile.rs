//! Lazy repair of half-written relationship edges

use std::sync::Arc;
use tracing::{debug, warn};

use super::{RelationshipError, Result};
use crate::models::{EdgeField, UserId, UserRecord};
use crate::storage::{StorageResult, UserStore};

/// Whether a write inserts into or removes from a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Add,
    Remove,
}

/// A single-record set mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeWrite {
    /// Record being written
    pub owner: UserId,
    pub field: EdgeField,
    pub value: UserId,
    pub action: WriteAction,
}

impl EdgeWrite {
    pub fn add(owner: &UserId, field: EdgeField, value: &UserId) -> Self {
        Self {
            owner: owner.clone(),
            field,
            value: value.clone(),
            action: WriteAction::Add,
        }
    }

    pub fn remove(owner: &UserId, field: EdgeField, value: &UserId) -> Self {
        Self {
            owner: owner.clone(),
            field,
            value: value.clone(),
            action: WriteAction::Remove,
        }
    }

    /// Issue the write against a store.
    pub async fn apply(&self, store: &dyn UserStore) -> StorageResult<()> {
        match self.action {
            WriteAction::Add => store.add_to_set(&self.owner, self.field, &self.value).await,
            WriteAction::Remove => {
                store
                    .remove_from_set(&self.owner, self.field, &self.value)
                    .await
            }
        }
    }
}

/// Compute the writes that bring the pair `(a, b)` back to a consistent state.
///
/// Rules, first match wins:
/// 1. either side lists the other as a friend: both friends entries, no requests
/// 2. both sides have a pending request to the other: resolve to friends
/// 3. `b ∈ a.pending` without `a ∈ b.requested`: add the missing requested entry
/// 4. `a ∈ b.requested` without `b ∈ a.pending`: drop the orphaned requested entry
///
/// Rules 3 and 4 are checked in both directions. An empty plan means the pair
/// is consistent.
pub fn plan_repairs(a: &UserRecord, b: &UserRecord) -> Vec<EdgeWrite> {
    let friends = a.has_edge(EdgeField::Friends, &b.id) || b.has_edge(EdgeField::Friends, &a.id);
    let mutual_pending =
        a.has_edge(EdgeField::Pending, &b.id) && b.has_edge(EdgeField::Pending, &a.id);

    if friends || mutual_pending {
        return befriend(a, b);
    }

    let mut plan = Vec::new();
    for (from, to) in [(a, b), (b, a)] {
        let sent = from.has_edge(EdgeField::Pending, &to.id);
        let received = to.has_edge(EdgeField::Requested, &from.id);
        if sent && !received {
            plan.push(EdgeWrite::add(&to.id, EdgeField::Requested, &from.id));
        } else if received && !sent {
            plan.push(EdgeWrite::remove(&to.id, EdgeField::Requested, &from.id));
        }
    }
    plan
}

/// Once a repair is needed both friends entries are written, whatever the
/// records show; set inserts are idempotent and the records may be older
/// than the store.
fn befriend(a: &UserRecord, b: &UserRecord) -> Vec<EdgeWrite> {
    let settled = [(a, b), (b, a)].iter().all(|(owner, other)| {
        owner.has_edge(EdgeField::Friends, &other.id)
            && !owner.has_edge(EdgeField::Pending, &other.id)
            && !owner.has_edge(EdgeField::Requested, &other.id)
    });
    if settled {
        return Vec::new();
    }

    let mut plan = Vec::new();
    for (owner, other) in [(a, b), (b, a)] {
        plan.push(EdgeWrite::add(&owner.id, EdgeField::Friends, &other.id));
        for field in [EdgeField::Pending, EdgeField::Requested] {
            if owner.has_edge(field, &other.id) {
                plan.push(EdgeWrite::remove(&owner.id, field, &other.id));
            }
        }
    }
    plan
}

/// Applies [`plan_repairs`] against the store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<dyn UserStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Reconcile a single pair. Returns the writes that were applied.
    pub async fn reconcile_pair(&self, a: &UserId, b: &UserId) -> Result<Vec<EdgeWrite>> {
        if a == b {
            return Err(RelationshipError::SelfReference(a.clone()));
        }

        let a_record = self.fetch(a).await?;
        let b_record = self.fetch(b).await?;

        let plan = plan_repairs(&a_record, &b_record);
        self.apply(&plan).await?;
        Ok(plan)
    }

    /// Reconcile every pair `a` takes part in and drop any self edges.
    pub async fn reconcile_user(&self, a: &UserId) -> Result<Vec<EdgeWrite>> {
        let record = self.fetch(a).await?;

        let mut applied = Vec::new();
        for field in [EdgeField::Friends, EdgeField::Pending, EdgeField::Requested] {
            if record.has_edge(field, a) {
                applied.push(EdgeWrite::remove(a, field, a));
            }
        }
        self.apply(&applied).await?;

        let others = record.counterparts().into_iter().filter(|other| other != a);

        // Each pair is planned from fresh reads of both records
        for other in others {
            match self.reconcile_pair(a, &other).await {
                Ok(plan) => applied.extend(plan),
                Err(RelationshipError::NotFound(missing)) if missing == other => {
                    warn!(user = %a, counterpart = %other, "Skipping edge to missing user");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(applied)
    }

    async fn fetch(&self, id: &UserId) -> Result<UserRecord> {
        self.store
            .get_user(id)
            .await
            .map_err(|e| RelationshipError::from_store(e, id))?
            .ok_or_else(|| RelationshipError::NotFound(id.clone()))
    }

    async fn apply(&self, plan: &[EdgeWrite]) -> Result<()> {
        for write in plan {
            warn!(
                owner = %write.owner,
                field = %write.field,
                value = %write.value,
                action = ?write.action,
                "Repairing relationship edge"
            );
            write
                .apply(self.store.as_ref())
                .await
                .map_err(|e| RelationshipError::from_store(e, &write.owner))?;
        }
        if plan.is_empty() {
            debug!("Relationship edges already consistent");
        }
        Ok(())
    }
}
