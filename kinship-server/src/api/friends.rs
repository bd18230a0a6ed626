//! Friend request and friend list endpoints

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
    response::Json,
};
use kinship::models::{ListDirection, UserId};
use kinship::relationships::RelationshipOutcome;

use crate::{
    api::{
        auth::AuthContext,
        dto::{ActionResponse, UserSummaryDto},
    },
    error::{ServerResult, bad_request},
    state::AppState,
    websocket::WebSocketMessage,
};

/// Send a friend request
#[utoipa::path(
    post,
    path = "/api/friends/requests/{id}",
    tag = "friends",
    params(
        ("id" = String, Path, description = "User to send the request to")
    ),
    responses(
        (status = 200, description = "Request sent, or accepted if the user had already asked", body = ActionResponse),
        (status = 400, description = "Self request, already friends, or store failure"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn send_request(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<ActionResponse>> {
    let target = UserId::new(id)?;
    let outcome = state
        .kinship
        .engine()
        .send_request(&auth.user_id, &target)
        .await?;

    announce(&state, &auth.user_id, &target, outcome);
    Ok(Json(outcome.into()))
}

/// List sent or received friend requests
#[utoipa::path(
    get,
    path = "/api/friends/requests/{id}",
    tag = "friends",
    params(
        ("id" = String, Path, description = "`sent` or `received`")
    ),
    responses(
        (status = 200, description = "Users on the other side of each request", body = Vec<UserSummaryDto>),
        (status = 400, description = "Unknown direction or store failure"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<UserSummaryDto>>> {
    let direction: ListDirection = id.parse().map_err(|e: String| bad_request(&e))?;
    let users = state
        .kinship
        .listing()
        .list_requests(&auth.user_id, direction)
        .await?;

    Ok(Json(users.into_iter().map(UserSummaryDto::from).collect()))
}

/// Accept a received friend request
#[utoipa::path(
    post,
    path = "/api/friends/requests/{id}/accept",
    tag = "friends",
    params(
        ("id" = String, Path, description = "User who sent the request")
    ),
    responses(
        (status = 200, description = "Request accepted", body = ActionResponse),
        (status = 400, description = "Store failure"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such request")
    )
)]
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<ActionResponse>> {
    let sender = UserId::new(id)?;
    let outcome = state
        .kinship
        .engine()
        .accept_request(&auth.user_id, &sender)
        .await?;

    announce(&state, &auth.user_id, &sender, outcome);
    Ok(Json(outcome.into()))
}

/// Reject a received friend request
#[utoipa::path(
    post,
    path = "/api/friends/requests/{id}/reject",
    tag = "friends",
    params(
        ("id" = String, Path, description = "User who sent the request")
    ),
    responses(
        (status = 200, description = "Request rejected, or nothing to reject", body = ActionResponse),
        (status = 400, description = "Store failure"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<ActionResponse>> {
    let sender = UserId::new(id)?;
    let outcome = state
        .kinship
        .engine()
        .reject_request(&auth.user_id, &sender)
        .await?;

    announce(&state, &auth.user_id, &sender, outcome);
    Ok(Json(outcome.into()))
}

/// Cancel a sent friend request
#[utoipa::path(
    delete,
    path = "/api/friends/requests/{id}",
    tag = "friends",
    params(
        ("id" = String, Path, description = "User the request was sent to")
    ),
    responses(
        (status = 200, description = "Request cancelled, or nothing to cancel", body = ActionResponse),
        (status = 400, description = "Store failure"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<ActionResponse>> {
    let target = UserId::new(id)?;
    let outcome = state
        .kinship
        .engine()
        .cancel_request(&auth.user_id, &target)
        .await?;

    announce(&state, &auth.user_id, &target, outcome);
    Ok(Json(outcome.into()))
}

/// List the requesting user's friends
#[utoipa::path(
    get,
    path = "/api/friends",
    tag = "friends",
    responses(
        (status = 200, description = "Friends ordered by id", body = Vec<UserSummaryDto>),
        (status = 400, description = "Store failure"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_friends(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ServerResult<Json<Vec<UserSummaryDto>>> {
    let friends = state.kinship.listing().list_friends(&auth.user_id).await?;
    Ok(Json(friends.into_iter().map(UserSummaryDto::from).collect()))
}

/// Remove a friend
#[utoipa::path(
    delete,
    path = "/api/friends/{id}",
    tag = "friends",
    params(
        ("id" = String, Path, description = "Friend to remove")
    ),
    responses(
        (status = 200, description = "Friend removed, or not a friend", body = ActionResponse),
        (status = 400, description = "Store failure"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn remove_friend(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<ActionResponse>> {
    let other = UserId::new(id)?;
    let outcome = state
        .kinship
        .engine()
        .remove_friend(&auth.user_id, &other)
        .await?;

    announce(&state, &auth.user_id, &other, outcome);
    Ok(Json(outcome.into()))
}

/// Push the change to both users' open sockets.
fn announce(state: &AppState, actor: &UserId, counterpart: &UserId, outcome: RelationshipOutcome) {
    if outcome == RelationshipOutcome::NoChange {
        return;
    }

    state.notify_users(
        &[actor, counterpart],
        WebSocketMessage::RelationshipChanged {
            actor: actor.to_string(),
            counterpart: counterpart.to_string(),
            outcome: outcome.to_string(),
        },
    );
}
