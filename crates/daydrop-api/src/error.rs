use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use daydrop_core::{CoreError, ErrorKind};
use daydrop_types::api::ErrorBody;

/// Handler error. Wraps the engine's rejections and adds the few failures
/// that only exist at the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("missing or invalid bearer token")]
    Unauthenticated,

    #[error("worker thread failed")]
    Join,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::CannotDrop => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, reason) = match &self {
            ApiError::Core(core) => {
                if let CoreError::Storage(e) = core {
                    error!("Storage error: {:#}", e);
                }
                (status_for(core.kind()), core.kind().as_str(), core.reason())
            }
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", self.to_string()),
            ApiError::Join => (StatusCode::INTERNAL_SERVER_ERROR, "internal", self.to_string()),
        };

        let body = ErrorBody {
            kind: kind.to_string(),
            reason,
        };
        (status, Json(body)).into_response()
    }
}
