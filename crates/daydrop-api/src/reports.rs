use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use daydrop_types::api::{Claims, ReportRequest};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::{AppState, run_blocking};

pub async fn report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reporter_id = actor(&claims);
    let report = run_blocking(&state, move |engine| {
        engine.reports.report(reporter_id, req.target, req.target_id, &req.reason)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(report)))
}
