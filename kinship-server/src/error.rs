//! Error handling for the Kinship server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kinship::relationships::RelationshipError;
use kinship::storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// Kinship library error
    #[error("Kinship error: {0}")]
    Kinship(#[from] kinship::KinshipError),

    /// Missing, invalid or unknown actor
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store failed; details are logged where the error is created
    #[error("The request could not be completed, please retry")]
    Store,

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) | ServerError::Store => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Kinship(kinship::KinshipError::InvalidValue(_)) => StatusCode::BAD_REQUEST,
            ServerError::Kinship(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Kinship(_) => "kinship_error",
            ServerError::Auth(_) => "authentication_error",
            ServerError::NotFound(_) => "not_found",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Conflict(_) => "conflict",
            ServerError::Store => "store_error",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl From<RelationshipError> for ServerError {
    fn from(err: RelationshipError) -> Self {
        match err {
            RelationshipError::NotFound(id) => not_found("User", id.as_str()),
            RelationshipError::Unauthorized(id) => {
                ServerError::Auth(format!("Unknown user '{}'", id))
            }
            e @ (RelationshipError::SelfReference(_) | RelationshipError::AlreadyRelated { .. }) => {
                ServerError::BadRequest(e.to_string())
            }
            RelationshipError::TransientStore(e) => e.into(),
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(msg) => ServerError::Conflict(msg),
            StorageError::NotFound(msg) => ServerError::NotFound(msg),
            e => {
                tracing::error!(error = %e, "Store operation failed");
                ServerError::Store
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Helper function to create a not found error
pub fn not_found(resource: &str, id: &str) -> ServerError {
    ServerError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Helper function to create a bad request error
pub fn bad_request(message: &str) -> ServerError {
    ServerError::BadRequest(message.to_string())
}
