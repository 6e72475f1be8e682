mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use daydrop_api::router;
use daydrop_api::state::{AppState, AppStateInner};
use daydrop_core::Engine;
use daydrop_db::Database;
use daydrop_gateway::dispatcher::Dispatcher;

use crate::config::ServerConfig;

const DEFAULT_LOG_FILTER: &str =
    "daydrop_server=debug,daydrop_api=debug,daydrop_core=debug,daydrop_gateway=debug,daydrop_db=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.addr()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    info!(path = %config.db_path.display(), "Database ready");

    // Ledgers publish into the dispatcher; delivery to clients is handled
    // by whatever registers a receiver with it.
    let engine = Engine::new(db, Arc::new(Dispatcher::new()));

    let state: AppState = Arc::new(AppStateInner {
        engine,
        jwt_secret: config.jwt_secret,
    });

    let app = router::build(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Daydrop server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
