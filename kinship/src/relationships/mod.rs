//! Friend relationship management
//!
//! Relationships live as mirrored edges on two user records. The
//! [`RelationshipEngine`] changes them with a local write followed by a
//! mirror write, the [`Reconciler`] repairs pairs left half-written, and the
//! [`RequestListingService`] projects a user's sets into summaries.

pub mod engine;
pub mod listing;
pub mod reconcile;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::UserId;
use crate::storage::StorageError;

pub use engine::RelationshipEngine;
pub use listing::RequestListingService;
pub use reconcile::{EdgeWrite, Reconciler, WriteAction, plan_repairs};

/// Errors returned by relationship operations.
#[derive(Debug, thiserror::Error)]
pub enum RelationshipError {
    /// The counterpart (or the pending request) does not exist
    #[error("User '{0}' not found")]
    NotFound(UserId),

    /// The actor named themselves as the counterpart
    #[error("User '{0}' cannot have a relationship with themselves")]
    SelfReference(UserId),

    /// The pair is already friends
    #[error("'{actor}' and '{target}' are already friends")]
    AlreadyRelated { actor: UserId, target: UserId },

    /// The actor identity has no user record
    #[error("Unknown actor '{0}'")]
    Unauthorized(UserId),

    /// The store failed; the operation may be retried
    #[error("Transient store error: {0}")]
    TransientStore(#[source] StorageError),
}

impl RelationshipError {
    /// Map a store failure observed while touching `id`'s record.
    pub(crate) fn from_store(err: StorageError, id: &UserId) -> Self {
        if err.is_not_found() {
            RelationshipError::NotFound(id.clone())
        } else {
            RelationshipError::TransientStore(err)
        }
    }
}

/// Explicit result of a successful relationship operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipOutcome {
    /// A new request was recorded
    RequestSent,
    /// The request already existed; its edges were re-asserted
    AlreadyPending,
    /// The target had already asked the actor, so the pair became friends
    AutoAccepted,
    Accepted,
    Rejected,
    Cancelled,
    Removed,
    /// Nothing to do; the pair was already in the requested end state
    NoChange,
}

impl RelationshipOutcome {
    /// Human readable confirmation returned to clients
    pub fn message(&self) -> &'static str {
        match self {
            RelationshipOutcome::RequestSent => "Friend request sent",
            RelationshipOutcome::AlreadyPending => "Friend request already pending",
            RelationshipOutcome::AutoAccepted => "Friend request accepted",
            RelationshipOutcome::Accepted => "Friend request accepted",
            RelationshipOutcome::Rejected => "Friend request rejected",
            RelationshipOutcome::Cancelled => "Friend request cancelled",
            RelationshipOutcome::Removed => "Friend removed",
            RelationshipOutcome::NoChange => "Nothing to change",
        }
    }

    /// Whether the pair became friends as a result
    pub fn made_friends(&self) -> bool {
        matches!(
            self,
            RelationshipOutcome::Accepted | RelationshipOutcome::AutoAccepted
        )
    }
}

impl fmt::Display for RelationshipOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationshipOutcome::RequestSent => "request_sent",
            RelationshipOutcome::AlreadyPending => "already_pending",
            RelationshipOutcome::AutoAccepted => "auto_accepted",
            RelationshipOutcome::Accepted => "accepted",
            RelationshipOutcome::Rejected => "rejected",
            RelationshipOutcome::Cancelled => "cancelled",
            RelationshipOutcome::Removed => "removed",
            RelationshipOutcome::NoChange => "no_change",
        };
        f.write_str(name)
    }
}

/// Result type for relationship operations
pub type Result<T> = std::result::Result<T, RelationshipError>;
