//! Server infrastructure module.
//!
//! - Router setup with tracing and security middleware
//! - Health and readiness endpoints
//! - Graceful shutdown
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router, health_router};
//!
//! let app = create_router(api_routes)
//!     .merge(health_router(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
//!
//! create_app(app, &ServerConfig::default()).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_app, create_router};
pub use health::{HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use shutdown::shutdown_signal;
