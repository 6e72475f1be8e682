use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{drops, follows, groups, reports};

/// Every route sits behind bearer auth.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/follows", post(follows::request_follow))
        .route("/follows/pending", get(follows::pending_requests))
        .route("/follows/{follow_id}/accept", post(follows::accept_follow))
        .route("/follows/{follow_id}", delete(follows::remove_follow))
        .route("/users/{user_id}/followers", get(follows::list_followers))
        .route("/users/{user_id}/following", get(follows::list_following))
        .route("/users/{user_id}/follow", get(follows::follow_status))
        .route("/users/{user_id}/groups", get(groups::list_user_groups))
        .route("/groups/{group_id}/join", post(groups::join_group))
        .route("/groups/{group_id}/members", get(groups::list_members).post(groups::add_member))
        .route("/groups/{group_id}/members/pending", get(groups::pending_members))
        .route("/groups/{group_id}/members/{member_id}/accept", post(groups::accept_member))
        .route("/groups/{group_id}/members/{member_id}/role", put(groups::update_role))
        .route("/groups/{group_id}/members/{member_id}", delete(groups::remove_member))
        .route("/notifications", post(drops::publish_notification))
        .route("/notifications/current", get(drops::current_notification))
        .route("/notifications/{notification_id}/eligibility", get(drops::eligibility))
        .route("/notifications/{notification_id}/drops", post(drops::create_drop))
        .route("/drops/{drop_id}", delete(drops::delete_drop))
        .route("/reports", post(reports::report))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
