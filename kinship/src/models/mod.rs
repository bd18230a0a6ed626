//! Domain models for users and the relationship edges between them

pub mod edge;
pub mod user;

// Re-export important models
pub use edge::{EdgeField, EdgeState, ListDirection, RelationshipStatus};
pub use user::{UserId, UserRecord, UserSummary};
