//! Actor identity for the Kinship API
//!
//! Every relationship call acts on behalf of a user resolved by an
//! [`IdentityProvider`]. Issuing credentials is left to the surrounding
//! system; this module only verifies them.

use std::fmt::Debug;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use headers::{Authorization, Cookie, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use kinship::models::UserId;
use serde::{Deserialize, Serialize};

use crate::{error::ServerError, state::AppState};

/// Cookie carrying the session token for browser clients
pub const TOKEN_COOKIE: &str = "token";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Issued at timestamp
    pub iat: usize,
    /// Expiration timestamp
    pub exp: usize,
}

/// Authenticated actor, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
}

/// Resolves the acting user from a request's credentials.
pub trait IdentityProvider: Send + Sync + Debug {
    fn resolve(&self, headers: &HeaderMap) -> Result<UserId, ServerError>;
}

/// Verifies HS256 tokens from the `Authorization: Bearer` header or the
/// `token` cookie.
#[derive(Debug, Clone)]
pub struct JwtIdentityProvider {
    secret: String,
}

impl JwtIdentityProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn resolve(&self, headers: &HeaderMap) -> Result<UserId, ServerError> {
        let token = match headers.typed_get::<Authorization<Bearer>>() {
            Some(bearer) => bearer.token().to_string(),
            None => headers
                .typed_get::<Cookie>()
                .and_then(|cookie| cookie.get(TOKEN_COOKIE).map(str::to_string))
                .ok_or_else(|| ServerError::Auth("Missing credentials".to_string()))?,
        };

        validate_jwt_token(&token, &self.secret)
    }
}

/// Trusts a header set by an authenticating gateway in front of the server.
#[derive(Debug, Clone)]
pub struct HeaderIdentityProvider {
    header: String,
}

impl HeaderIdentityProvider {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl IdentityProvider for HeaderIdentityProvider {
    fn resolve(&self, headers: &HeaderMap) -> Result<UserId, ServerError> {
        let value = headers
            .get(self.header.as_str())
            .ok_or_else(|| ServerError::Auth(format!("Missing {} header", self.header)))?
            .to_str()
            .map_err(|_| ServerError::Auth(format!("Malformed {} header", self.header)))?;

        UserId::new(value).map_err(|e| ServerError::Auth(e.to_string()))
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let path = request.uri().path();
    if is_public_endpoint(request.method(), path) {
        tracing::debug!("Path {} is public, skipping auth", path);
        return Ok(next.run(request).await);
    }

    let user_id = state.identity.resolve(&headers)?;
    tracing::debug!(user = %user_id, "Resolved request actor");

    request.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(request).await)
}

/// Check if an endpoint is public (doesn't require an actor)
fn is_public_endpoint(method: &axum::http::Method, path: &str) -> bool {
    path == "/health" || (method == axum::http::Method::POST && path == "/users")
}

/// Validate a JWT token and return the user it was issued to
fn validate_jwt_token(token: &str, secret: &str) -> Result<UserId, ServerError> {
    let decoding_key = DecodingKey::from_secret(secret.as_ref());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| ServerError::Auth(format!("Invalid token: {}", e)))?;

    UserId::new(token_data.claims.sub)
        .map_err(|e| ServerError::Auth(format!("Invalid user ID in token: {}", e)))
}

/// Generate a JWT token for a user
pub fn generate_jwt_token(
    user_id: &UserId,
    secret: &str,
    expiration_hours: u64,
) -> Result<(String, i64), ServerError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let exp = now + (expiration_hours * 3600) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp,
    };

    let encoding_key = EncodingKey::from_secret(secret.as_ref());
    let token = encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| ServerError::Auth(format!("Failed to generate token: {}", e)))?;

    Ok((token, exp as i64))
}
