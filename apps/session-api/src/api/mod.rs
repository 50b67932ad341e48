use crate::state::AppState;
use axum::Router;
use domain_sessions::SessionStore;

pub mod auth;
pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it.
/// Returns a stateless Router (state is applied inside).
pub fn routes<S: SessionStore + 'static>(state: &AppState<S>) -> Router {
    Router::new().nest("/auth", auth::router(state))
}

/// `/ready`, checking that the session store answers.
pub fn ready_router<S: SessionStore + 'static>(state: AppState<S>) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler::<S>))
        .with_state(state)
}
