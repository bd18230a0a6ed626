//! User record model holding the three mirrored edge sets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::edge::{EdgeField, EdgeState};
use crate::KinshipError;

/// Opaque, stable identity of a user (the username).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id, rejecting empty or padded values.
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(KinshipError::InvalidValue(
                "user id cannot be empty".to_string(),
            ));
        }
        if value.trim() != value {
            return Err(KinshipError::InvalidValue(format!(
                "user id '{}' has surrounding whitespace",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Persisted user entity.
///
/// Profile attributes (`display_name`, `avatar`) are opaque to the
/// relationship engine. The three edge sets are only ever mutated through
/// single-element `add_to_set` / `remove_from_set` calls on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,

    /// Mutual relationships
    #[serde(default)]
    pub friends: BTreeSet<UserId>,

    /// Users this user sent an unaccepted request to
    #[serde(default)]
    pub pending: BTreeSet<UserId>,

    /// Users who sent this user an unaccepted request
    #[serde(default)]
    pub requested: BTreeSet<UserId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a record with no edges.
    pub fn new(id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: None,
            avatar: None,
            friends: BTreeSet::new(),
            pending: BTreeSet::new(),
            requested: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Borrow the set named by `field`.
    pub fn edges(&self, field: EdgeField) -> &BTreeSet<UserId> {
        match field {
            EdgeField::Friends => &self.friends,
            EdgeField::Pending => &self.pending,
            EdgeField::Requested => &self.requested,
        }
    }

    /// Mutably borrow the set named by `field`.
    pub fn edges_mut(&mut self, field: EdgeField) -> &mut BTreeSet<UserId> {
        match field {
            EdgeField::Friends => &mut self.friends,
            EdgeField::Pending => &mut self.pending,
            EdgeField::Requested => &mut self.requested,
        }
    }

    /// Whether `other` appears in the set named by `field`.
    pub fn has_edge(&self, field: EdgeField, other: &UserId) -> bool {
        self.edges(field).contains(other)
    }

    /// Edge state as seen from this record alone.
    ///
    /// Friends wins over pending/requested so that a half-applied accept
    /// still reads as a friendship.
    pub fn local_state(&self, other: &UserId) -> EdgeState {
        if self.friends.contains(other) {
            EdgeState::Friends
        } else if self.pending.contains(other) {
            EdgeState::Outgoing
        } else if self.requested.contains(other) {
            EdgeState::Incoming
        } else {
            EdgeState::None
        }
    }

    /// Every identity referenced by any of the three sets.
    pub fn counterparts(&self) -> BTreeSet<UserId> {
        self.friends
            .iter()
            .chain(self.pending.iter())
            .chain(self.requested.iter())
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

/// Display-worthy projection of a user used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            display_name: record.display_name.clone(),
            avatar: record.avatar.clone(),
        }
    }
}
