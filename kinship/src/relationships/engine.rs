//! Relationship state machine over mirrored edges

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::reconcile::{EdgeWrite, Reconciler};
use super::{RelationshipError, RelationshipOutcome, Result};
use crate::config::ReconciliationConfig;
use crate::models::{EdgeField, EdgeState, RelationshipStatus, UserId, UserRecord};
use crate::storage::UserStore;

/// Executes friend-request transitions for a verified actor.
///
/// Each operation writes the actor's record first and the counterpart's
/// record second. A mirror write that fails transiently is retried; if it
/// keeps failing the caller gets [`RelationshipError::TransientStore`] and
/// the [`Reconciler`] completes the edge later.
#[derive(Debug, Clone)]
pub struct RelationshipEngine {
    store: Arc<dyn UserStore>,
    reconciler: Reconciler,
    config: ReconciliationConfig,
}

impl RelationshipEngine {
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

    /// Ask `target` to become the actor's friend.
    pub async fn send_request(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<RelationshipOutcome> {
        let (actor_record, target_record) = self.load_pair(actor, target).await?;

        let friends_here = actor_record.has_edge(EdgeField::Friends, target);
        let friends_there = target_record.has_edge(EdgeField::Friends, actor);
        if friends_here || friends_there {
            if friends_here != friends_there {
                warn!(actor = %actor, target = %target, "Repairing one-sided friendship");
                self.reconciler.reconcile_pair(actor, target).await?;
            }
            return Err(RelationshipError::AlreadyRelated {
                actor: actor.clone(),
                target: target.clone(),
            });
        }

        if actor_record.has_edge(EdgeField::Requested, target)
            || target_record.has_edge(EdgeField::Pending, actor)
        {
            self.write_acceptance(actor, target).await?;
            info!(actor = %actor, target = %target, "Mutual request auto-accepted");
            return Ok(RelationshipOutcome::AutoAccepted);
        }

        let already_pending = actor_record.has_edge(EdgeField::Pending, target)
            && target_record.has_edge(EdgeField::Requested, actor);

        self.local(EdgeWrite::add(actor, EdgeField::Pending, target))
            .await?;
        self.mirror(EdgeWrite::add(target, EdgeField::Requested, actor))
            .await?;

        // A reverse request may have landed between the snapshot and our writes
        match self.store.get_user(target).await {
            Ok(Some(current)) if current.has_edge(EdgeField::Pending, actor) => {
                info!(actor = %actor, target = %target, "Concurrent mutual request resolved");
                self.reconciler.reconcile_pair(actor, target).await?;
                return Ok(RelationshipOutcome::AutoAccepted);
            }
            Ok(_) => {}
            Err(e) => warn!(target = %target, error = %e, "Could not re-read request target"),
        }

        if already_pending {
            debug!(actor = %actor, target = %target, "Friend request already pending");
            Ok(RelationshipOutcome::AlreadyPending)
        } else {
            info!(actor = %actor, target = %target, "Friend request sent");
            Ok(RelationshipOutcome::RequestSent)
        }
    }

    /// Accept the pending request `sender` sent to the actor.
    pub async fn accept_request(
        &self,
        actor: &UserId,
        sender: &UserId,
    ) -> Result<RelationshipOutcome> {
        let (actor_record, _) = self.load_pair(actor, sender).await?;

        if !actor_record.has_edge(EdgeField::Requested, sender) {
            if actor_record.has_edge(EdgeField::Friends, sender) {
                // An earlier accept committed locally; finish its mirror
                self.reconciler.reconcile_pair(actor, sender).await?;
                debug!(actor = %actor, sender = %sender, "Request already accepted");
                return Ok(RelationshipOutcome::NoChange);
            }
            return Err(RelationshipError::NotFound(sender.clone()));
        }

        self.write_acceptance(actor, sender).await?;
        info!(actor = %actor, sender = %sender, "Friend request accepted");
        Ok(RelationshipOutcome::Accepted)
    }

    /// Decline the pending request `sender` sent to the actor.
    pub async fn reject_request(
        &self,
        actor: &UserId,
        sender: &UserId,
    ) -> Result<RelationshipOutcome> {
        let (actor_record, sender_record) = self.load_pair(actor, sender).await?;
        let existed = actor_record.has_edge(EdgeField::Requested, sender)
            || sender_record.has_edge(EdgeField::Pending, actor);

        self.local(EdgeWrite::remove(actor, EdgeField::Requested, sender))
            .await?;
        self.mirror(EdgeWrite::remove(sender, EdgeField::Pending, actor))
            .await?;

        Ok(self.removal_outcome(existed, RelationshipOutcome::Rejected, actor, sender))
    }

    /// Withdraw the actor's pending request to `target`.
    pub async fn cancel_request(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<RelationshipOutcome> {
        let (actor_record, target_record) = self.load_pair(actor, target).await?;
        let existed = actor_record.has_edge(EdgeField::Pending, target)
            || target_record.has_edge(EdgeField::Requested, actor);

        self.local(EdgeWrite::remove(actor, EdgeField::Pending, target))
            .await?;
        self.mirror(EdgeWrite::remove(target, EdgeField::Requested, actor))
            .await?;

        Ok(self.removal_outcome(existed, RelationshipOutcome::Cancelled, actor, target))
    }

    /// End the friendship between the actor and `other`.
    pub async fn remove_friend(
        &self,
        actor: &UserId,
        other: &UserId,
    ) -> Result<RelationshipOutcome> {
        let (actor_record, other_record) = self.load_pair(actor, other).await?;
        let existed = actor_record.has_edge(EdgeField::Friends, other)
            || other_record.has_edge(EdgeField::Friends, actor);

        self.local(EdgeWrite::remove(actor, EdgeField::Friends, other))
            .await?;
        self.mirror(EdgeWrite::remove(other, EdgeField::Friends, actor))
            .await?;

        Ok(self.removal_outcome(existed, RelationshipOutcome::Removed, actor, other))
    }

    /// How `subject` relates to `viewer`, read from both records.
    pub async fn relationship_status(
        &self,
        viewer: &UserId,
        subject: &UserId,
    ) -> Result<RelationshipStatus> {
        if viewer == subject {
            self.fetch(viewer)
                .await?
                .ok_or_else(|| RelationshipError::Unauthorized(viewer.clone()))?;
            return Ok(RelationshipStatus::Myself);
        }

        let (viewer_record, subject_record) = self.load_pair(viewer, subject).await?;
        Ok(observed_state(&viewer_record, &subject_record).into())
    }

    async fn write_acceptance(&self, actor: &UserId, sender: &UserId) -> Result<()> {
        self.local(EdgeWrite::add(actor, EdgeField::Friends, sender))
            .await?;
        self.local(EdgeWrite::remove(actor, EdgeField::Requested, sender))
            .await?;
        self.mirror(EdgeWrite::add(sender, EdgeField::Friends, actor))
            .await?;
        self.mirror(EdgeWrite::remove(sender, EdgeField::Pending, actor))
            .await
    }

    fn removal_outcome(
        &self,
        existed: bool,
        outcome: RelationshipOutcome,
        actor: &UserId,
        other: &UserId,
    ) -> RelationshipOutcome {
        if existed {
            info!(actor = %actor, other = %other, outcome = %outcome, "Relationship updated");
            outcome
        } else {
            debug!(actor = %actor, other = %other, "No relationship edge to remove");
            RelationshipOutcome::NoChange
        }
    }

    /// Check the common preconditions and snapshot both records.
    async fn load_pair(&self, actor: &UserId, other: &UserId) -> Result<(UserRecord, UserRecord)> {
        if actor == other {
            return Err(RelationshipError::SelfReference(actor.clone()));
        }

        let actor_record = self
            .fetch(actor)
            .await?
            .ok_or_else(|| RelationshipError::Unauthorized(actor.clone()))?;
        let other_record = self
            .fetch(other)
            .await?
            .ok_or_else(|| RelationshipError::NotFound(other.clone()))?;

        Ok((actor_record, other_record))
    }

    async fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>> {
        self.store
            .get_user(id)
            .await
            .map_err(|e| RelationshipError::from_store(e, id))
    }

    async fn local(&self, write: EdgeWrite) -> Result<()> {
        write
            .apply(self.store.as_ref())
            .await
            .map_err(|e| RelationshipError::from_store(e, &write.owner))
    }

    /// Write the counterpart's record, retrying transient failures with a
    /// linearly growing delay.
    async fn mirror(&self, write: EdgeWrite) -> Result<()> {
        let mut attempt = 0;
        loop {
            match write.apply(self.store.as_ref()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.config.mirror_retry_attempts => {
                    attempt += 1;
                    warn!(
                        owner = %write.owner,
                        field = %write.field,
                        attempt,
                        error = %e,
                        "Mirror write failed, retrying"
                    );
                    tokio::time::sleep(self.config.mirror_retry_backoff * attempt).await;
                }
                Err(e) => {
                    warn!(
                        owner = %write.owner,
                        field = %write.field,
                        value = %write.value,
                        error = %e,
                        "Mirror write abandoned; reconciliation will complete it"
                    );
                    return Err(RelationshipError::from_store(e, &write.owner));
                }
            }
        }
    }
}

/// Pair state seen from `viewer`, trusting whichever side has the edge.
fn observed_state(viewer: &UserRecord, subject: &UserRecord) -> EdgeState {
    if viewer.has_edge(EdgeField::Friends, &subject.id)
        || subject.has_edge(EdgeField::Friends, &viewer.id)
    {
        EdgeState::Friends
    } else if viewer.has_edge(EdgeField::Pending, &subject.id)
        || subject.has_edge(EdgeField::Requested, &viewer.id)
    {
        EdgeState::Outgoing
    } else if viewer.has_edge(EdgeField::Requested, &subject.id)
        || subject.has_edge(EdgeField::Pending, &viewer.id)
    {
        EdgeState::Incoming
    } else {
        EdgeState::None
    }
}
