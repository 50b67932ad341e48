//! Host-framework seam.
//!
//! The engine never sees a framework request type. A host implements
//! [`AuthorizationAdapter`] over whatever it has (an axum `HeaderMap`, a test
//! fixture) and the engine reads tokens from the configured header or cookie
//! names.

use crate::claims::{AccessClaims, Payload, RefreshClaims, TokenType};
use crate::config::TokenNames;
use crate::engine::{EarlyRefresh, IssuedTokens, SessionEngine};
use uuid::Uuid;
use crate::error::{SessionError, SessionResult};
use crate::store::SessionStore;
use std::collections::HashMap;
use tracing::debug;

/// Read-only view of an incoming request.
pub trait AuthorizationAdapter {
    /// Header names are matched case-insensitively.
    fn request_headers(&self) -> HashMap<String, String>;

    fn request_cookies(&self) -> HashMap<String, String>;

    /// HTTP method, e.g. `"GET"`
    fn request_method(&self) -> String;
}

/// Methods that can change state need a CSRF token alongside the access token.
pub fn requires_csrf(method: &str) -> bool {
    !matches!(method.to_ascii_uppercase().as_str(), "GET" | "HEAD")
}

/// Framework-free adapter, built up field by field.
///
/// # Example
///
/// ```
/// use domain_sessions::{AuthorizationAdapter, PlainRequest};
///
/// let request = PlainRequest::new("POST")
///     .with_header("Authorization", "Bearer abc")
///     .with_cookie("jwt_refresh", "def");
/// assert_eq!(request.request_method(), "POST");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlainRequest {
    method: String,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl PlainRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

impl AuthorizationAdapter for PlainRequest {
    fn request_headers(&self) -> HashMap<String, String> {
        self.headers.clone()
    }

    fn request_cookies(&self) -> HashMap<String, String> {
        self.cookies.clone()
    }

    fn request_method(&self) -> String {
        self.method.clone()
    }
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Strip an optional `Bearer ` scheme
fn bearer(value: &str) -> &str {
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    Header,
    Cookie,
}

/// Token from the header first, then the cookie
fn locate_token(
    adapter: &impl AuthorizationAdapter,
    header_name: &str,
    cookie_name: &str,
) -> Option<(String, TokenSource)> {
    let headers = adapter.request_headers();
    if let Some(value) = header(&headers, header_name) {
        return Some((bearer(value).to_string(), TokenSource::Header));
    }

    adapter
        .request_cookies()
        .get(cookie_name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(|value| (value, TokenSource::Cookie))
}

pub(crate) fn access_token(
    adapter: &impl AuthorizationAdapter,
    names: &TokenNames,
) -> Option<String> {
    locate_token(adapter, &names.access_header, &names.access_cookie).map(|(token, _)| token)
}

fn locate_refresh_token(
    adapter: &impl AuthorizationAdapter,
    names: &TokenNames,
) -> Option<(String, TokenSource)> {
    locate_token(adapter, &names.refresh_header, &names.refresh_cookie)
}

impl<S: SessionStore> SessionEngine<S> {
    /// Authenticate a request: verify its access token and, for anything but
    /// GET/HEAD, the masked CSRF token against the live session record.
    pub async fn authenticate(
        &self,
        adapter: &impl AuthorizationAdapter,
    ) -> SessionResult<AccessClaims> {
        let names = &self.config().token_names;
        let token = access_token(adapter, names).ok_or_else(|| {
            debug!("Request carries no access token");
            SessionError::Unauthorized
        })?;

        let claims = self.verify_access(&token)?;

        if requires_csrf(&adapter.request_method()) {
            self.check_csrf_header(adapter, claims.sid).await?;
        }

        Ok(claims)
    }

    /// Refresh using the token found on the request.
    pub async fn refresh_request(
        &self,
        adapter: &impl AuthorizationAdapter,
        new_access_payload: Payload,
    ) -> SessionResult<IssuedTokens> {
        self.refresh_request_with_hook(adapter, new_access_payload, |_| {})
            .await
    }

    pub async fn refresh_request_with_hook<F>(
        &self,
        adapter: &impl AuthorizationAdapter,
        new_access_payload: Payload,
        on_early_refresh: F,
    ) -> SessionResult<IssuedTokens>
    where
        F: FnOnce(EarlyRefresh) + Send,
    {
        let token = self.request_refresh_token(adapter).await?;
        self.refresh_with_hook(&token, new_access_payload, on_early_refresh)
            .await
    }

    /// Log out using the refresh token found on the request.
    pub async fn logout_request(&self, adapter: &impl AuthorizationAdapter) -> SessionResult<()> {
        let token = self.request_refresh_token(adapter).await?;
        self.logout(&token).await
    }

    /// The request's refresh token. When it arrives in a cookie on a
    /// state-changing method the session's CSRF token must accompany it.
    async fn request_refresh_token(
        &self,
        adapter: &impl AuthorizationAdapter,
    ) -> SessionResult<String> {
        let (token, source) = locate_refresh_token(adapter, &self.config().token_names)
            .ok_or_else(|| {
                debug!("Request carries no refresh token");
                SessionError::Unauthorized
            })?;

        if source == TokenSource::Cookie && requires_csrf(&adapter.request_method()) {
            let claims: RefreshClaims = self.decode(&token, TokenType::Refresh)?;
            self.check_csrf_header(adapter, claims.sid).await?;
        }

        Ok(token)
    }

    async fn check_csrf_header(
        &self,
        adapter: &impl AuthorizationAdapter,
        session_id: Uuid,
    ) -> SessionResult<()> {
        let headers = adapter.request_headers();
        let method = adapter.request_method();
        let candidate =
            header(&headers, &self.config().token_names.csrf_header).ok_or_else(|| {
                debug!(session_id = %session_id, method = %method, "Missing CSRF token");
                SessionError::Unauthorized
            })?;

        if !self.verify_csrf(session_id, candidate).await? {
            debug!(session_id = %session_id, method = %method, "CSRF token mismatch");
            return Err(SessionError::Unauthorized);
        }
        Ok(())
    }
}
