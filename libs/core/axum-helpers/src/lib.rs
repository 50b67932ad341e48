//! # Axum Helpers
//!
//! Glue between axum and the session engine in `domain_sessions`.
//!
//! ## Modules
//!
//! - **[`auth`]**: request adapter, session middleware, token cookies
//! - **[`server`]**: server startup, health/readiness, graceful shutdown
//! - **[`http`]**: HTTP middleware (security headers)
//! - **[`errors`]**: JSON error responses
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::{Router, middleware, routing::post};
//! use axum_helpers::{create_app, create_router, session_auth_middleware};
//!
//! let protected = Router::new()
//!     .route("/orders", post(create_order))
//!     .layer(middleware::from_fn_with_state(engine.clone(), session_auth_middleware));
//!
//! let router = create_router(protected);
//! create_app(router, &ServerConfig::default()).await?;
//! ```

pub mod auth;
pub mod errors;
pub mod http;
pub mod server;

// Re-export auth types
pub use auth::{
    CookieSettings, HttpRequestAdapter, SessionCookies, session_auth_middleware,
};

// Re-export server types
pub use server::{
    HealthCheckFuture, HealthResponse, create_app, create_router, health_router,
    run_health_checks, shutdown_signal,
};

// Re-export HTTP middleware
pub use http::security_headers;

// Re-export error types
pub use errors::{AppError, ErrorBody, ErrorResponse};
