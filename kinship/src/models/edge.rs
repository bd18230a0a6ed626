//! Edge vocabulary shared by the store contract and the engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names one of the three set-valued fields on a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeField {
    Friends,
    Pending,
    Requested,
}

impl EdgeField {
    /// Persisted field name
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeField::Friends => "friends",
            EdgeField::Pending => "pending",
            EdgeField::Requested => "requested",
        }
    }
}

impl fmt::Display for EdgeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the edge between an ordered pair (A, B), seen from A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeState {
    /// No relationship
    None,
    /// A sent B a request that is not yet answered
    Outgoing,
    /// B sent A a request that is not yet answered
    Incoming,
    /// Mutual friendship
    Friends,
}

/// Viewer-relative relationship flags shown on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    /// The viewer is looking at their own profile
    Myself,
    Friends,
    /// The viewer has a pending request to the subject
    RequestSent,
    /// The subject has a pending request to the viewer
    RequestReceived,
    None,
}

impl RelationshipStatus {
    pub fn is_friend(&self) -> bool {
        matches!(self, RelationshipStatus::Friends | RelationshipStatus::Myself)
    }
}

impl From<EdgeState> for RelationshipStatus {
    fn from(state: EdgeState) -> Self {
        match state {
            EdgeState::None => RelationshipStatus::None,
            EdgeState::Outgoing => RelationshipStatus::RequestSent,
            EdgeState::Incoming => RelationshipStatus::RequestReceived,
            EdgeState::Friends => RelationshipStatus::Friends,
        }
    }
}

/// Which request list to project from a user's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListDirection {
    /// Requests the user has sent (their `pending` set)
    Sent,
    /// Requests the user has received (their `requested` set)
    Received,
}

impl ListDirection {
    /// Field holding this direction's counterparts
    pub fn field(&self) -> EdgeField {
        match self {
            ListDirection::Sent => EdgeField::Pending,
            ListDirection::Received => EdgeField::Requested,
        }
    }
}

impl FromStr for ListDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(ListDirection::Sent),
            "received" => Ok(ListDirection::Received),
            _ => Err(format!("Invalid request direction: {}", s)),
        }
    }
}

impl fmt::Display for ListDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListDirection::Sent => write!(f, "sent"),
            ListDirection::Received => write!(f, "received"),
        }
    }
}
