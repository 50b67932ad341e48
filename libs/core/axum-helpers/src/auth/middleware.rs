use super::adapter::HttpRequestAdapter;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use domain_sessions::{SessionEngine, SessionStore};

/// Session authentication middleware
///
/// Verifies the access token from the configured header or cookie and, for
/// anything other than GET/HEAD, the masked CSRF token. Inserts
/// `AccessClaims` into request extensions on success.
///
/// # Example
///
/// ```ignore
/// use axum::{Extension, Router, middleware, routing::post};
/// use axum_helpers::session_auth_middleware;
/// use domain_sessions::AccessClaims;
///
/// async fn handler(Extension(claims): Extension<AccessClaims>) -> String {
///     claims.sid.to_string()
/// }
///
/// let protected = Router::new()
///     .route("/orders", post(handler))
///     .layer(middleware::from_fn_with_state(engine.clone(), session_auth_middleware));
/// ```
pub async fn session_auth_middleware<S>(
    State(engine): State<SessionEngine<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    S: SessionStore + 'static,
{
    let claims = {
        let adapter = HttpRequestAdapter::new(request.method(), request.headers());
        engine.authenticate(&adapter).await?
    };

    tracing::debug!(session_id = %claims.sid, "Request authenticated");
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
