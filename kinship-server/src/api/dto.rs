//! Data Transfer Objects for the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use kinship::models::{RelationshipStatus, UserRecord, UserSummary};
use kinship::relationships::RelationshipOutcome;

/// Result of a relationship action
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    /// Human readable result
    pub msg: String,

    /// Machine readable result, e.g. `request_sent` or `no_change`
    pub outcome: String,
}

impl From<RelationshipOutcome> for ActionResponse {
    fn from(outcome: RelationshipOutcome) -> Self {
        Self {
            msg: outcome.message().to_string(),
            outcome: outcome.to_string(),
        }
    }
}

/// User as shown in request and friend lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummaryDto {
    pub id: String,
    pub display_name: Option<String>,
    /// Avatar URL
    pub avatar: Option<String>,
}

impl From<UserSummary> for UserSummaryDto {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: summary.id.into_inner(),
            display_name: summary.display_name,
            avatar: summary.avatar,
        }
    }
}

/// Registered user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserDto {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            display_name: record.display_name,
            avatar: record.avatar,
            created_at: record.created_at,
        }
    }
}

/// Request to register a user record
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Stable user id (the username)
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub avatar: Option<String>,
}

/// How the requesting user relates to another user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelationshipStatusDto {
    pub user_id: String,

    /// One of `myself`, `friends`, `request_sent`, `request_received`, `none`
    pub status: String,
}

/// Profile of a user as seen by the requesting user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,

    /// The profile owner's friends
    pub friends: Vec<UserSummaryDto>,

    /// The viewer is looking at their own profile
    pub owner: bool,

    /// The viewer is the owner or a friend
    pub is_friend: bool,

    /// The owner has sent the viewer a request
    pub is_requested: bool,

    pub status: String,
}

impl ProfileDto {
    pub fn new(
        record: UserRecord,
        friends: Vec<UserSummary>,
        status: RelationshipStatus,
    ) -> Self {
        Self {
            id: record.id.into_inner(),
            display_name: record.display_name,
            avatar: record.avatar,
            friends: friends.into_iter().map(UserSummaryDto::from).collect(),
            owner: status == RelationshipStatus::Myself,
            is_friend: status.is_friend(),
            is_requested: status == RelationshipStatus::RequestReceived,
            status: status_name(status).to_string(),
        }
    }
}

pub fn status_name(status: RelationshipStatus) -> &'static str {
    match status {
        RelationshipStatus::Myself => "myself",
        RelationshipStatus::Friends => "friends",
        RelationshipStatus::RequestSent => "request_sent",
        RelationshipStatus::RequestReceived => "request_received",
        RelationshipStatus::None => "none",
    }
}
