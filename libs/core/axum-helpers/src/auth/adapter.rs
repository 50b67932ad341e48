use axum::http::{HeaderMap, Method, header, request::Parts};
use domain_sessions::AuthorizationAdapter;
use std::collections::HashMap;

/// Borrowed view of an axum request for the session engine.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequestAdapter<'a> {
    method: &'a Method,
    headers: &'a HeaderMap,
}

impl<'a> HttpRequestAdapter<'a> {
    pub fn new(method: &'a Method, headers: &'a HeaderMap) -> Self {
        Self { method, headers }
    }

    pub fn from_parts(parts: &'a Parts) -> Self {
        Self::new(&parts.method, &parts.headers)
    }
}

impl AuthorizationAdapter for HttpRequestAdapter<'_> {
    /// Non-UTF-8 values are skipped
    fn request_headers(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .filter(|(name, _)| *name != header::COOKIE)
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }

    fn request_cookies(&self) -> HashMap<String, String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect()
    }

    fn request_method(&self) -> String {
        self.method.as_str().to_string()
    }
}
