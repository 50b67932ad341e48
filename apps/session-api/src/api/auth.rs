//! Session endpoints
//!
//! - `POST /login`: open a session (demo: no credential check)
//! - `POST /refresh`: rotate using the refresh token header or cookie
//!   (a cookie must come with `X-CSRF-Token`)
//! - `POST /logout`: end the session and clear cookies
//! - `GET /session`: current claims plus a freshly masked CSRF token
//! - `POST /csrf`: re-mask the CSRF token (CSRF-protected itself)

use crate::state::AppState;
use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_helpers::{AppError, HttpRequestAdapter, SessionCookies, session_auth_middleware};
use domain_sessions::{AccessClaims, Payload, SessionStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: Value,
    /// Extra claims for the access token
    #[serde(default)]
    pub claims: Payload,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub expires_at: i64,
    pub payload: Payload,
    pub csrf: String,
}

#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    pub csrf: String,
}

pub fn router<S: SessionStore + 'static>(state: &AppState<S>) -> Router {
    let protected = Router::new()
        .route("/session", get(session::<S>))
        .route("/csrf", post(csrf::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.engine.clone(),
            session_auth_middleware::<S>,
        ));

    Router::new()
        .route("/login", post(login::<S>))
        .route("/refresh", post(refresh::<S>))
        .route("/logout", post(logout::<S>))
        .merge(protected)
        .with_state(state.clone())
}

async fn login<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Json(input): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if input.user_id.is_null() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }

    let mut payload = input.claims;
    payload.insert("user_id".to_string(), input.user_id);

    // The refresh payload rebuilds the access payload on every rotation
    let issued = state.engine.login(payload.clone(), Some(payload)).await?;

    let cookies = SessionCookies::new(state.engine.config(), &state.cookies).issued(&issued)?;
    Ok((cookies, Json(issued)).into_response())
}

async fn refresh<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let adapter = HttpRequestAdapter::new(&method, &headers);

    let issued = state
        .engine
        .refresh_request_with_hook(&adapter, Payload::new(), |event| {
            let user_agent = headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::warn!(
                target: "audit",
                session_id = %event.session_id,
                access_expires_at = event.access_expires_at,
                user_agent,
                "Early refresh, possible refresh token theft"
            );
        })
        .await?;

    let cookies = SessionCookies::new(state.engine.config(), &state.cookies).issued(&issued)?;
    Ok((cookies, Json(issued)).into_response())
}

async fn logout<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let adapter = HttpRequestAdapter::new(&method, &headers);
    state.engine.logout_request(&adapter).await?;

    let cookies = SessionCookies::new(state.engine.config(), &state.cookies).cleared()?;
    Ok((cookies, StatusCode::NO_CONTENT).into_response())
}

async fn session<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<SessionResponse>, AppError> {
    let csrf = state.engine.issue_csrf(claims.sid).await?;

    Ok(Json(SessionResponse {
        session_id: claims.sid.to_string(),
        expires_at: claims.exp,
        payload: claims.payload,
        csrf,
    }))
}

async fn csrf<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<CsrfResponse>, AppError> {
    let csrf = state.engine.issue_csrf(claims.sid).await?;
    Ok(Json(CsrfResponse { csrf }))
}
