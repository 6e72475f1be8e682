use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use daydrop_types::api::{Claims, FollowRequest};
use daydrop_types::models::{DbId, Follow};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::{AppState, run_blocking};

pub async fn request_follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let follower_id = actor(&claims);
    let follow = run_blocking(&state, move |engine| {
        engine.follows.request_follow(follower_id, req.followed_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(follow)))
}

pub async fn accept_follow(
    State(state): State<AppState>,
    Path(follow_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Follow>, ApiError> {
    let user_id = actor(&claims);
    let follow = run_blocking(&state, move |engine| engine.follows.accept_follow(follow_id, user_id)).await?;
    Ok(Json(follow))
}

/// Reject a pending request or unfollow. Either side of the edge may call this.
pub async fn remove_follow(
    State(state): State<AppState>,
    Path(follow_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let user_id = actor(&claims);
    run_blocking(&state, move |engine| engine.follows.reject_or_unfollow(follow_id, user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pending_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Follow>>, ApiError> {
    let user_id = actor(&claims);
    let pending = run_blocking(&state, move |engine| engine.follows.pending_requests(user_id)).await?;
    Ok(Json(pending))
}

pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Follow>>, ApiError> {
    let requester_id = actor(&claims);
    let followers = run_blocking(&state, move |engine| engine.follows.list_followers(user_id, requester_id)).await?;
    Ok(Json(followers))
}

pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Follow>>, ApiError> {
    let requester_id = actor(&claims);
    let following = run_blocking(&state, move |engine| engine.follows.list_following(user_id, requester_id)).await?;
    Ok(Json(following))
}

/// The caller's own live edge towards `user_id`, or `null`.
pub async fn follow_status(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Option<Follow>>, ApiError> {
    let follower_id = actor(&claims);
    let edge = run_blocking(&state, move |engine| engine.follows.follow_between(follower_id, user_id)).await?;
    Ok(Json(edge.found()))
}
