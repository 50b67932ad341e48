use crate::codec::CodecError;
use core_config::ConfigError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors returned by the session engine.
///
/// Every credential problem (bad signature, expiry, malformed token, unknown
/// or superseded session, CSRF mismatch) is the single `Unauthorized`
/// variant, so callers cannot be used as an oracle. Backend outages stay
/// distinct.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token issuance failed: {0}")]
    Token(#[source] CodecError),

    /// Rejected at engine construction
    #[error("Invalid session configuration: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Unauthorized)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
