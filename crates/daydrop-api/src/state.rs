use std::sync::Arc;

use tracing::error;

use daydrop_core::{CoreResult, Engine};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Engine,
    pub jwt_secret: String,
}

/// Run a ledger operation off the async runtime. Ledger calls block on
/// SQLite, so they always go through `spawn_blocking`.
pub async fn run_blocking<F, T>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&Engine) -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || op(&state.engine))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Join
        })?
        .map_err(ApiError::from)
}
