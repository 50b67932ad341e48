use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};
use domain_sessions::SessionStore;

/// Readiness check: 503 while the session store is unreachable.
pub async fn ready_handler<S: SessionStore + 'static>(State(state): State<AppState<S>>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "session_store",
        Box::pin(async {
            state
                .engine
                .store()
                .ping()
                .await
                .map_err(|e| format!("Session store ping failed: {}", e))
        }),
    )];

    run_health_checks(checks).await.into_response()
}
