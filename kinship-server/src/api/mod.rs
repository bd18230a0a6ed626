//! API implementation for the Kinship HTTP server

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, post},
};
use kinship::storage::BaseStore;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{state::AppState, websocket::websocket_handler};

pub mod auth;
pub mod dto;
pub mod friends;
pub mod users;

use auth::auth_middleware;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        friends::send_request,
        friends::list_requests,
        friends::accept_request,
        friends::reject_request,
        friends::cancel_request,
        friends::list_friends,
        friends::remove_friend,
        users::create_user,
        users::get_profile,
        users::relationship_status,
        health_check,
    ),
    components(
        schemas(
            dto::ActionResponse,
            dto::UserSummaryDto,
            dto::UserDto,
            dto::CreateUserRequest,
            dto::ProfileDto,
            dto::RelationshipStatusDto,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "friends", description = "Friend requests and friend lists"),
        (name = "users", description = "User registration and profiles"),
        (name = "health", description = "Service health"),
        (name = "websocket", description = "WebSocket relationship events"),
    ),
    info(
        title = "Kinship Relationship API",
        version = "1.0.0",
        description = "Friend requests, friend lists and relationship status between users. Every action is performed on behalf of the authenticated user.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/api", description = "API base path")
    )
)]
pub struct ApiDoc;

/// Create the main router with all API endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        // Friend requests; `{id}` is a user id except on GET, where it is the direction
        .route(
            "/friends/requests/{id}",
            post(friends::send_request)
                .get(friends::list_requests)
                .delete(friends::cancel_request),
        )
        .route(
            "/friends/requests/{id}/accept",
            post(friends::accept_request),
        )
        .route(
            "/friends/requests/{id}/reject",
            post(friends::reject_request),
        )
        // Friends
        .route("/friends", get(friends::list_friends))
        .route("/friends/{id}", delete(friends::remove_friend))
        // Users
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_profile))
        .route(
            "/users/{id}/relationship",
            get(users::relationship_status),
        )
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(state.config.max_request_size))
        .with_state(state);

    let swagger_router = SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new().nest("/api", api_router).merge(swagger_router)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Store is reachable", body = serde_json::Value),
        (status = 503, description = "Store is unavailable", body = serde_json::Value)
    )
)]
async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let store = state.kinship.store();
    let healthy = match store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "status": if healthy { "OK" } else { "UNAVAILABLE" },
        "version": kinship::VERSION,
        "storage": state.kinship.config().storage.engine.to_string(),
        "reconcile_on_list": state.kinship.config().reconciliation.reconcile_on_list,
        "authentication": state.config.enable_auth,
        "websocket_connections": state.websocket_connection_count(),
    });

    (status, Json(body))
}
