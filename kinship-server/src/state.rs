//! Application state management

use std::sync::Arc;

use dashmap::DashMap;
use kinship::Kinship;
use kinship::models::UserId;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::api::auth::{HeaderIdentityProvider, IdentityProvider, JwtIdentityProvider};
use crate::config::ServerConfig;
use crate::websocket::WebSocketMessage;

/// An open WebSocket and the user it belongs to
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub user_id: UserId,
    pub sender: broadcast::Sender<WebSocketMessage>,
}

/// Application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    /// Relationship services
    pub kinship: Kinship,

    /// Server configuration
    pub config: ServerConfig,

    /// Resolves the acting user from request headers
    pub identity: Arc<dyn IdentityProvider>,

    /// WebSocket connections
    pub websocket_connections: DashMap<Uuid, ConnectionHandle>,
}

impl AppState {
    /// Create new application state
    ///
    /// With authentication enabled the actor comes from a JWT; otherwise it
    /// is taken from the trusted identity header set by a fronting gateway.
    pub fn new(kinship: Kinship, config: ServerConfig) -> Self {
        let identity: Arc<dyn IdentityProvider> = if config.enable_auth {
            Arc::new(JwtIdentityProvider::new(config.jwt_secret.clone()))
        } else {
            Arc::new(HeaderIdentityProvider::new(
                config.trusted_identity_header.clone(),
            ))
        };

        Self::with_identity_provider(kinship, config, identity)
    }

    /// Create application state with a custom identity provider
    pub fn with_identity_provider(
        kinship: Kinship,
        config: ServerConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            kinship,
            config,
            identity,
            websocket_connections: DashMap::new(),
        }
    }

    /// Add a WebSocket connection
    pub fn add_websocket_connection(
        &self,
        id: Uuid,
        user_id: UserId,
        sender: broadcast::Sender<WebSocketMessage>,
    ) {
        self.websocket_connections
            .insert(id, ConnectionHandle { user_id, sender });
    }

    /// Remove a WebSocket connection
    pub fn remove_websocket_connection(&self, id: &Uuid) {
        self.websocket_connections.remove(id);
    }

    /// Send a message to every connection owned by one of `users`.
    ///
    /// Connections whose receiver has gone away are dropped.
    pub fn notify_users(&self, users: &[&UserId], message: WebSocketMessage) {
        self.websocket_connections.retain(|_, handle| {
            if users.contains(&&handle.user_id) {
                handle.sender.send(message.clone()).is_ok()
            } else {
                true
            }
        });
    }

    /// Get the number of active WebSocket connections
    pub fn websocket_connection_count(&self) -> usize {
        self.websocket_connections.len()
    }
}
