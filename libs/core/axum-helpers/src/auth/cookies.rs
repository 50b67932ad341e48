use crate::errors::AppError;
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::AppendHeaders;
use core_config::Environment;
use domain_sessions::{IssuedTokens, SessionConfig};

/// Cookie attributes shared by every session cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Adds `Secure`; off only for plain-HTTP development
    pub secure: bool,
    pub path: String,
}

impl CookieSettings {
    pub fn for_environment(environment: &Environment) -> Self {
        Self {
            secure: environment.use_https(),
            path: "/".to_string(),
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            path: "/".to_string(),
        }
    }
}

type CookieHeaders = AppendHeaders<[(HeaderName, HeaderValue); 2]>;

/// Builds `Set-Cookie` headers for the configured access and refresh cookie
/// names. Cookies are `HttpOnly` and `SameSite=Strict`; the CSRF token is
/// returned in the body instead so scripts can echo it back.
pub struct SessionCookies<'a> {
    config: &'a SessionConfig,
    settings: &'a CookieSettings,
}

impl<'a> SessionCookies<'a> {
    pub fn new(config: &'a SessionConfig, settings: &'a CookieSettings) -> Self {
        Self { config, settings }
    }

    pub fn issued(&self, tokens: &IssuedTokens) -> Result<CookieHeaders, AppError> {
        let names = &self.config.token_names;
        Ok(AppendHeaders([
            (
                header::SET_COOKIE,
                self.cookie(&names.access_cookie, &tokens.access, self.config.access_ttl)?,
            ),
            (
                header::SET_COOKIE,
                self.cookie(&names.refresh_cookie, &tokens.refresh, self.config.refresh_ttl)?,
            ),
        ]))
    }

    /// Expire both cookies immediately
    pub fn cleared(&self) -> Result<CookieHeaders, AppError> {
        let names = &self.config.token_names;
        Ok(AppendHeaders([
            (header::SET_COOKIE, self.cookie(&names.access_cookie, "", 0)?),
            (header::SET_COOKIE, self.cookie(&names.refresh_cookie, "", 0)?),
        ]))
    }

    fn cookie(&self, name: &str, value: &str, max_age: i64) -> Result<HeaderValue, AppError> {
        let secure_flag = if self.settings.secure { " Secure;" } else { "" };
        let cookie = format!(
            "{}={}; HttpOnly;{} SameSite=Strict; Path={}; Max-Age={}",
            name, value, secure_flag, self.settings.path, max_age
        );

        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::InternalServerError(format!("Failed to create cookie: {}", e)))
    }
}
