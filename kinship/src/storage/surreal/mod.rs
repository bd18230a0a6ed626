//! SurrealDB-backed user store
//!
//! Users live in a single `person` table. Each edge mutation is one
//! `UPDATE` statement on one record, so SurrealDB's per-statement atomicity
//! gives the per-record serialisation the engine relies on.

mod base;
mod schema;
mod user;

pub use base::{SurrealStoreConfig, SurrealUserStore};

/// Table holding user records
pub(crate) const USER_TABLE: &str = "person";
