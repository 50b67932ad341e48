//! Session authentication for axum.
//!
//! - [`HttpRequestAdapter`]: exposes an axum request to the session engine
//! - [`session_auth_middleware`]: access token + CSRF check, inserts
//!   [`AccessClaims`](domain_sessions::AccessClaims) into request extensions
//! - [`SessionCookies`]: `Set-Cookie` values for issued tokens

pub mod adapter;
pub mod cookies;
pub mod middleware;

pub use adapter::HttpRequestAdapter;
pub use cookies::{CookieSettings, SessionCookies};
pub use middleware::session_auth_middleware;
