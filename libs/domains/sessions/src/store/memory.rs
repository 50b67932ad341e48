use super::{SessionRecord, SessionStore, StoreError};
use crate::clock::{Clock, SystemClock};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of SessionStore (for development/testing).
///
/// TTLs are honoured against the supplied [`Clock`]; expired entries read as
/// absent and are swept out every few hundred writes.
#[derive(Clone)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<Uuid, (SessionRecord, i64)>>>,
    writes: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

const PRUNE_EVERY: u64 = 256;

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            writes: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Number of live records
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let records = self.records.read().await;
        records.values().filter(|(_, expires)| *expires > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(
        &self,
        id: Uuid,
        record: &SessionRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let expires_at = now.saturating_add(ttl_seconds as i64);

        let mut records = self.records.write().await;
        if self.writes.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            records.retain(|_, (_, expires)| *expires > now);
        }
        records.insert(id, (record.clone(), expires_at));

        tracing::debug!(session_id = %id, ttl_seconds, "Stored session record");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let now = self.clock.now();
        let records = self.records.read().await;
        Ok(records
            .get(&id)
            .filter(|(_, expires)| *expires > now)
            .map(|(record, _)| record.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.take(id).await?.is_some())
    }

    async fn take(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        Ok(records
            .remove(&id)
            .filter(|(_, expires)| *expires > now)
            .map(|(record, _)| record))
    }
}
