//! Session record persistence.
//!
//! [`SessionStore`] is the capability the engine needs from a TTL-capable
//! key-value backend. [`RedisSessionStore`] is the production backend;
//! [`InMemorySessionStore`] serves tests and single-process development.

mod memory;
mod redis;

pub use self::memory::InMemorySessionStore;
pub use self::redis::{RedisConfig, RedisSessionStore};

use crate::claims::Payload;
use crate::csrf::CsrfSecret;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Server-side state for one session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub csrf_secret: CsrfSecret,
    /// Unix timestamp at which the paired access token expires
    pub access_expires_at: i64,
    #[serde(default)]
    pub refresh_payload: Payload,
}

/// Infrastructure failures. Never a statement about the client's credentials.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Session record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Repository trait for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write a record that expires after `ttl_seconds`. Last writer wins.
    async fn put(
        &self,
        id: Uuid,
        record: &SessionRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError>;

    /// Fetch a live record. Absent and expired records are both `Ok(None)`.
    async fn get(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove a record. Returns whether a live record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Fetch and remove a record in one step.
    ///
    /// Of several concurrent callers for the same id at most one receives the
    /// record. The default relies on `delete` reporting whether it removed
    /// anything; backends with an atomic get-and-delete should override it.
    async fn take(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let Some(record) = self.get(id).await? else {
            return Ok(None);
        };

        if self.delete(id).await? {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
