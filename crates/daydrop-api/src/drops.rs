use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use daydrop_core::CoreError;
use daydrop_types::api::{Claims, CreateDropRequest, EligibilityResponse, PublishNotificationRequest};
use daydrop_types::models::{DbId, DropNotification};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::{AppState, run_blocking};

/// Admin only. Opens a new drop cycle.
pub async fn publish_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PublishNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor(&claims);
    let notification = run_blocking(&state, move |engine| {
        engine.drops.publish_notification_as(user_id, &req.kind)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn current_notification(
    State(state): State<AppState>,
) -> Result<Json<Option<DropNotification>>, ApiError> {
    let current = run_blocking(&state, |engine| engine.drops.current_notification()).await?;
    Ok(Json(current.found()))
}

/// A refusal is a normal answer here, so `CannotDrop` becomes `eligible: false`
/// instead of an error status.
pub async fn eligibility(
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    let user_id = actor(&claims);
    let verdict = run_blocking(&state, move |engine| {
        match engine.drops.can_create_drop(notification_id, user_id) {
            Ok(()) => Ok(None),
            Err(CoreError::CannotDrop(rejection)) => Ok(Some(rejection.to_string())),
            Err(e) => Err(e),
        }
    })
    .await?;

    Ok(Json(EligibilityResponse {
        eligible: verdict.is_none(),
        reason: verdict,
    }))
}

pub async fn create_drop(
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateDropRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor(&claims);
    let drop = run_blocking(&state, move |engine| {
        engine.drops.create_drop(notification_id, user_id, &req.caption)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(drop)))
}

pub async fn delete_drop(
    State(state): State<AppState>,
    Path(drop_id): Path<DbId>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let user_id = actor(&claims);
    run_blocking(&state, move |engine| engine.drops.delete_drop(drop_id, user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
