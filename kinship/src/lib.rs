//! # Kinship
//!
//! Friend-relationship engine for social applications. Every relationship
//! between two users is stored as a pair of *mirrored edges* on the two user
//! records (`friends`, `pending`, `requested`), and the engine keeps those
//! mirrors consistent without multi-record transactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kinship::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let kinship = kinship::init(ConfigBuilder::testing().build()?).await?;
//!
//!     let alice = UserId::new("alice")?;
//!     let bob = UserId::new("bob")?;
//!     kinship.store().create_user(UserRecord::new(alice.clone())).await?;
//!     kinship.store().create_user(UserRecord::new(bob.clone())).await?;
//!
//!     kinship.engine().send_request(&alice, &bob).await?;
//!     kinship.engine().accept_request(&bob, &alice).await?;
//!
//!     let friends = kinship.listing().list_friends(&alice).await?;
//!     assert_eq!(friends[0].id, bob);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **storage**: the `UserStore` contract plus in-memory and SurrealDB backends.
//!   Each mutation touches exactly one record.
//! - **relationships**: the engine (local write, then mirror write), the
//!   reconciler that repairs half-completed pairs, and request listing.
//! - **config** / **logging**: figment-based configuration and tracing setup.

use std::sync::Arc;

pub mod config;
pub mod logging;
pub mod models;
pub mod relationships;
pub mod storage;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::Kinship;
    pub use crate::config::{ConfigBuilder, KinshipConfig, LogLevel, StorageEngine};
    pub use crate::init;
    pub use crate::models::{
        EdgeField, EdgeState, ListDirection, RelationshipStatus, UserId, UserRecord, UserSummary,
    };
    pub use crate::relationships::{
        Reconciler, RelationshipEngine, RelationshipError, RelationshipOutcome,
        RequestListingService,
    };
    pub use crate::storage::{StorageError, UserStore};
    pub use crate::{KinshipError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level error type for Kinship operations
#[derive(Debug, thiserror::Error)]
pub enum KinshipError {
    /// Error raised by a storage backend
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    /// Error raised by a relationship operation
    #[error("Relationship error: {0}")]
    Relationship(#[from] relationships::RelationshipError),

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(#[from] logging::LogError),

    /// A value did not satisfy a model constraint
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Result type for Kinship operations
pub type Result<T> = std::result::Result<T, KinshipError>;

/// Wired-up set of services sharing one user store.
#[derive(Debug, Clone)]
pub struct Kinship {
    store: Arc<dyn storage::UserStore>,
    reconciler: relationships::Reconciler,
    engine: relationships::RelationshipEngine,
    listing: relationships::RequestListingService,
    config: config::KinshipConfig,
}

impl Kinship {
    /// Build the services on top of an existing store.
    pub fn with_store(store: Arc<dyn storage::UserStore>, config: config::KinshipConfig) -> Self {
        let reconciler = relationships::Reconciler::new(store.clone());
        let engine = relationships::RelationshipEngine::new(
            store.clone(),
            reconciler.clone(),
            config.reconciliation.clone(),
        );
        let listing = relationships::RequestListingService::new(
            store.clone(),
            reconciler.clone(),
            config.reconciliation.clone(),
        );

        Self {
            store,
            reconciler,
            engine,
            listing,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn storage::UserStore> {
        &self.store
    }

    pub fn reconciler(&self) -> &relationships::Reconciler {
        &self.reconciler
    }

    pub fn engine(&self) -> &relationships::RelationshipEngine {
        &self.engine
    }

    pub fn listing(&self) -> &relationships::RequestListingService {
        &self.listing
    }

    pub fn config(&self) -> &config::KinshipConfig {
        &self.config
    }
}

/// Initialise Kinship from a validated configuration.
///
/// Creates the configured user store and wires the engine, reconciler and
/// listing service around it. Logging is not initialised here; call
/// [`logging::init`] from the binary if needed.
pub async fn init(config: config::KinshipConfig) -> Result<Kinship> {
    config::validate_config(&config)?;
    let store = storage::create_user_store(&config.storage).await?;
    tracing::info!(engine = %config.storage.engine, "Kinship initialised");
    Ok(Kinship::with_store(store, config))
}

/// Initialise Kinship with in-memory storage and default settings.
pub async fn init_with_defaults() -> Result<Kinship> {
    init(config::ConfigBuilder::testing().build()?).await
}
