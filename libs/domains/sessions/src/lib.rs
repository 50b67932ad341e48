//! Sessions Domain
//!
//! Issues short-lived access tokens and long-lived refresh tokens for
//! stateless clients, keeping just enough server-side state to detect
//! refresh-token reuse and to verify masked CSRF tokens.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ AuthorizationAdapter │  ← host framework: headers, cookies, method
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │    SessionEngine     │  ← login, refresh + hijack detection, verification
//! └───┬──────┬───────┬───┘
//!     │      │       │
//! ┌───▼──┐ ┌─▼────┐ ┌▼─────────────┐
//! │Codec │ │ CSRF │ │ SessionStore │  ← Redis or in-memory
//! └──────┘ └──────┘ └──────────────┘
//! ```
//!
//! Every token or session failure surfaces as [`SessionError::Unauthorized`].
//! Store outages surface as [`SessionError::Store`] so operators can tell
//! "no valid session" apart from "backend unreachable".
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_sessions::{InMemorySessionStore, Payload, SessionConfig, SessionEngine};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("change-me-to-a-secret-of-at-least-32-chars");
//! let engine = SessionEngine::new(config, InMemorySessionStore::new())?;
//!
//! let mut payload = Payload::new();
//! payload.insert("user_id".into(), json!(1));
//!
//! let issued = engine.login(payload, None).await?;
//! let claims = engine.verify_access(&issued.access)?;
//! assert_eq!(claims.payload["user_id"], 1);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod csrf;
pub mod engine;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use adapter::{AuthorizationAdapter, PlainRequest, requires_csrf};
pub use claims::{AccessClaims, Payload, RefreshClaims, TokenType};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CodecError, TokenCodec};
pub use config::{SessionConfig, SigningKeys, TokenNames};
pub use csrf::CsrfSecret;
pub use engine::{EarlyRefresh, IssuedTokens, SessionEngine};
pub use error::{SessionError, SessionResult};
pub use store::{
    InMemorySessionStore, RedisConfig, RedisSessionStore, SessionRecord, SessionStore, StoreError,
};
