use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use daydrop_types::api::{AddMemberRequest, Claims, JoinGroupRequest, UpdateRoleRequest};
use daydrop_types::models::{DbId, Group, GroupMember};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::{AppState, run_blocking};

pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor(&claims);
    let member = run_blocking(&state, move |engine| engine.groups.join_group(group_id, user_id, &req.role)).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor(&claims);
    let member = run_blocking(&state, move |engine| {
        engine.groups.add_member(group_id, req.member_id, user_id, &req.role)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn accept_member(
    State(state): State<AppState>,
    Path((group_id, member_id)): Path<(DbId, DbId)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<GroupMember>, ApiError> {
    let user_id = actor(&claims);
    let member = run_blocking(&state, move |engine| engine.groups.accept_member(group_id, member_id, user_id)).await?;
    Ok(Json(member))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path((group_id, member_id)): Path<(DbId, DbId)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<GroupMember>, ApiError> {
    let user_id = actor(&claims);
    let member = run_blocking(&state, move |engine| {
        engine.groups.update_role(group_id, member_id, user_id, &req.role)
    })
    .await?;
    Ok(Json(member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, member_id)): Path<(DbId, DbId)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let user_id = actor(&claims);
    run_blocking(&state, move |engine| engine.groups.remove_member(group_id, member_id, user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<GroupMember>>, ApiError> {
    let user_id = actor(&claims);
    let members = run_blocking(&state, move |engine| engine.groups.list_members(group_id, user_id)).await?;
    Ok(Json(members))
}

pub async fn pending_members(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<GroupMember>>, ApiError> {
    let user_id = actor(&claims);
    let pending = run_blocking(&state, move |engine| engine.groups.pending_members(group_id, user_id)).await?;
    Ok(Json(pending))
}

/// Private groups only show up for requesters who could see their members.
pub async fn list_user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let requester_id = actor(&claims);
    let groups = run_blocking(&state, move |engine| {
        engine.groups.list_user_groups_for(user_id, requester_id)
    })
    .await?;
    Ok(Json(groups))
}
