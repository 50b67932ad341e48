use axum_helpers::server::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_sessions::{RedisSessionStore, SessionEngine};
use tracing::info;

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let store = RedisSessionStore::connect(&config.redis, config.session.key_prefix.clone())
        .await
        .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))?;

    let engine = SessionEngine::new(config.session.clone(), store)
        .map_err(|e| eyre::eyre!("Failed to initialize session engine: {}", e))?;

    let state = AppState::new(engine, &config.environment);

    // - /api/auth/*: session endpoints
    // - /health: liveness
    // - /ready: readiness, pings the session store
    let app = create_router(api::routes(&state))
        .merge(health_router(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
        .merge(api::ready_router(state));

    info!(environment = ?config.environment, "Starting session API");

    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Session API shutdown complete");
    Ok(())
}
