//! User registration and profile endpoints

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use kinship::models::{UserId, UserRecord};

use crate::{
    api::{
        auth::AuthContext,
        dto::{CreateUserRequest, ProfileDto, RelationshipStatusDto, UserDto, status_name},
    },
    error::{ServerResult, not_found},
    state::AppState,
};

/// Register a user record
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserDto),
        (status = 400, description = "Invalid user id"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> ServerResult<(StatusCode, Json<UserDto>)> {
    let mut record = UserRecord::new(UserId::new(request.id)?);
    record.display_name = request.display_name;
    record.avatar = request.avatar;

    let created = state.kinship.store().create_user(record).await?;
    tracing::info!(user = %created.id, "User registered");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get a user's profile as seen by the requesting user
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Profile with relationship flags", body = ProfileDto),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<ProfileDto>> {
    let subject = UserId::new(id)?;
    let record = state
        .kinship
        .store()
        .get_user(&subject)
        .await?
        .ok_or_else(|| not_found("User", subject.as_str()))?;

    let status = state
        .kinship
        .engine()
        .relationship_status(&auth.user_id, &subject)
        .await?;
    let friends = state.kinship.listing().list_friends(&subject).await?;

    Ok(Json(ProfileDto::new(record, friends, status)))
}

/// Get how a user relates to the requesting user
#[utoipa::path(
    get,
    path = "/api/users/{id}/relationship",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Relationship status", body = RelationshipStatusDto),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn relationship_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<RelationshipStatusDto>> {
    let subject = UserId::new(id)?;
    let status = state
        .kinship
        .engine()
        .relationship_status(&auth.user_id, &subject)
        .await?;

    Ok(Json(RelationshipStatusDto {
        user_id: subject.into_inner(),
        status: status_name(status).to_string(),
    }))
}
