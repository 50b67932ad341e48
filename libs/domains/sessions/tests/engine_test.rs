//! Session lifecycle tests against the in-memory store
//!
//! Time is driven by a `ManualClock` shared by the engine and the store, so
//! expiry and early-refresh behaviour is deterministic.

use async_trait::async_trait;
use domain_sessions::*;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use test_utils::TestDataBuilder;
use test_utils::assertions::*;

const SECRET: &str = "integration-test-secret-at-least-32-characters";
const T0: i64 = 1_700_000_000;

fn setup(clock: &ManualClock) -> SessionEngine<InMemorySessionStore> {
    let store = InMemorySessionStore::with_clock(Arc::new(clock.clone()));
    SessionEngine::with_clock(SessionConfig::new(SECRET), store, Arc::new(clock.clone())).unwrap()
}

fn user(id: i64) -> Payload {
    let mut payload = Payload::new();
    payload.insert("user_id".into(), json!(id));
    payload
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_login_verify_refresh_scenario() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);

    let first = engine.login(user(1), None).await.unwrap();
    assert!(!first.access.is_empty());
    assert!(!first.refresh.is_empty());
    assert!(!first.csrf.is_empty());

    let claims = engine.verify_access(&first.access).unwrap();
    assert_eq!(claims.payload["user_id"], json!(1));
    assert_uuid_eq(claims.sid, first.session_id, "access sid");
    assert_eq!(claims.exp, T0 + 3600);

    clock.set(T0 + 3700);
    let second = engine.refresh(&first.refresh, user(1)).await.unwrap();
    assert_uuid_ne(second.session_id, first.session_id, "rotated sid");

    let claims = engine.verify_access(&second.access).unwrap();
    assert_eq!(claims.payload["user_id"], json!(1));
    assert_eq!(claims.exp, T0 + 3700 + 3600);

    // Both credentials from the first login are now dead
    assert!(engine.verify_access(&first.access).unwrap_err().is_unauthorized());
    assert!(
        engine
            .refresh(&first.refresh, user(1))
            .await
            .unwrap_err()
            .is_unauthorized()
    );
}

#[tokio::test]
async fn test_verify_access_round_trips_payload() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let builder = TestDataBuilder::from_test_name("verify_access_round_trip");

    let mut payload = builder.payload();
    payload.insert("roles".into(), json!(["admin", "billing"]));
    payload.insert("profile".into(), json!({"name": "Ada", "verified": true}));

    let issued = engine.login(payload.clone(), None).await.unwrap();
    let claims = engine.verify_access(&issued.access).unwrap();

    assert_eq!(claims.payload, payload);
    assert_eq!(claims.typ, TokenType::Access);
}

// ============================================================================
// Rotation and hijack detection
// ============================================================================

#[tokio::test]
async fn test_stale_refresh_token_is_rejected() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);

    let r1 = engine.login(user(1), None).await.unwrap();
    clock.advance(4000);

    let r2 = engine.refresh(&r1.refresh, Payload::new()).await.unwrap();
    let err = engine.refresh(&r1.refresh, Payload::new()).await.unwrap_err();
    assert!(err.is_unauthorized());

    // The legitimate holder of r2 is unaffected
    clock.advance(4000);
    engine.refresh(&r2.refresh, Payload::new()).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_refresh_has_one_winner() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);

    let issued = engine.login(user(1), None).await.unwrap();
    clock.advance(4000);

    let (a, b) = tokio::join!(
        engine.refresh(&issued.refresh, Payload::new()),
        engine.refresh(&issued.refresh, Payload::new()),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(SessionError::is_unauthorized)
    );
    assert_eq!(engine.store().len().await, 1);
}

#[tokio::test]
async fn test_refresh_replaces_session_record() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);

    let first = engine.login(user(1), None).await.unwrap();
    clock.advance(4000);
    let second = engine.refresh(&first.refresh, Payload::new()).await.unwrap();

    let store = engine.store();
    assert!(store.get(first.session_id).await.unwrap().is_none());
    let old_csrf_valid = engine.verify_csrf(first.session_id, &first.csrf).await;
    assert!(old_csrf_valid.unwrap_err().is_unauthorized());

    let record = assert_some(
        store.get(second.session_id).await.unwrap(),
        "rotated record",
    );
    assert_eq!(record.access_expires_at, second.access_expires_at);
    // A new secret per session: the old masked token does not verify
    assert!(!engine.verify_csrf(second.session_id, &first.csrf).await.unwrap());
    assert!(engine.verify_csrf(second.session_id, &second.csrf).await.unwrap());
}

#[tokio::test]
async fn test_refresh_payload_rebuilds_access_payload() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);

    let issued = engine
        .login(user(9), Some(user(9)))
        .await
        .unwrap();
    clock.advance(4000);

    // Caller resubmits nothing; the stored refresh payload is enough
    let rotated = engine.refresh(&issued.refresh, Payload::new()).await.unwrap();
    let claims = engine.verify_access(&rotated.access).unwrap();
    assert_eq!(claims.payload["user_id"], json!(9));

    clock.advance(4000);
    let again = engine.refresh(&rotated.refresh, Payload::new()).await.unwrap();
    let claims = engine.verify_access(&again.access).unwrap();
    assert_eq!(claims.payload["user_id"], json!(9));
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test]
async fn test_expired_access_token_is_rejected() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    clock.set(issued.access_expires_at);
    engine.verify_access(&issued.access).unwrap();

    clock.set(issued.access_expires_at + 1);
    assert!(engine.verify_access(&issued.access).unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_leeway_tolerates_clock_skew() {
    let clock = ManualClock::at(T0);
    let store = InMemorySessionStore::with_clock(Arc::new(clock.clone()));
    let config = SessionConfig::new(SECRET).with_leeway(30);
    let engine = SessionEngine::with_clock(config, store, Arc::new(clock.clone())).unwrap();

    let issued = engine.login(user(1), None).await.unwrap();
    clock.set(issued.access_expires_at + 30);
    engine.verify_access(&issued.access).unwrap();

    clock.advance(1);
    assert!(engine.verify_access(&issued.access).is_err());
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    clock.set(issued.refresh_expires_at + 1);
    let err = engine.refresh(&issued.refresh, Payload::new()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);

    let forger = SessionEngine::with_clock(
        SessionConfig::new("a-completely-different-secret-of-32-chars"),
        InMemorySessionStore::new(),
        Arc::new(clock.clone()),
    )
    .unwrap();
    let forged = forger.login(user(1), None).await.unwrap();

    assert!(engine.verify_access(&forged.access).unwrap_err().is_unauthorized());
    assert!(engine.verify_access("not.a.token").unwrap_err().is_unauthorized());
    assert!(engine.verify_access("").unwrap_err().is_unauthorized());
}

// ============================================================================
// Early refresh hook
// ============================================================================

#[tokio::test]
async fn test_early_refresh_hook_called_once() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    clock.advance(60);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);

    let rotated = engine
        .refresh_with_hook(&issued.refresh, user(1), move |event| {
            recorded.lock().unwrap().push(event);
        })
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![EarlyRefresh {
            session_id: issued.session_id,
            access_expires_at: issued.access_expires_at,
        }]
    );
    engine.verify_access(&rotated.access).unwrap();
}

#[tokio::test]
async fn test_hook_not_called_after_access_expiry() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    clock.set(issued.access_expires_at);
    let mut called = false;
    engine
        .refresh_with_hook(&issued.refresh, user(1), |_| called = true)
        .await
        .unwrap();
    assert!(!called);
}

// ============================================================================
// CSRF and logout
// ============================================================================

#[tokio::test]
async fn test_csrf_masks_differ_but_verify() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    let again = engine.issue_csrf(issued.session_id).await.unwrap();
    assert_ne!(again, issued.csrf);
    assert!(engine.verify_csrf(issued.session_id, &again).await.unwrap());
    assert!(engine.verify_csrf(issued.session_id, &issued.csrf).await.unwrap());
    assert!(!engine.verify_csrf(issued.session_id, "garbage").await.unwrap());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    engine.logout(&issued.refresh).await.unwrap();

    assert!(engine.logout(&issued.refresh).await.unwrap_err().is_unauthorized());
    assert!(
        engine
            .refresh(&issued.refresh, Payload::new())
            .await
            .unwrap_err()
            .is_unauthorized()
    );
    assert!(
        engine
            .verify_csrf(issued.session_id, &issued.csrf)
            .await
            .unwrap_err()
            .is_unauthorized()
    );
    // Access tokens are stateless and stay valid until they expire
    engine.verify_access(&issued.access).unwrap();
}

#[tokio::test]
async fn test_logout_requires_refresh_token() {
    let clock = ManualClock::at(T0);
    let engine = setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();

    assert!(engine.logout(&issued.access).await.unwrap_err().is_unauthorized());
    assert!(engine.store().get(issued.session_id).await.unwrap().is_some());
}

// ============================================================================
// Store outages
// ============================================================================

/// In-memory store that fails on demand
#[derive(Clone)]
struct FlakyStore {
    inner: InMemorySessionStore,
    failing_puts: Arc<AtomicUsize>,
    failing_takes: Arc<AtomicUsize>,
    down: Arc<AtomicBool>,
}

impl FlakyStore {
    fn new(clock: &ManualClock) -> Self {
        Self {
            inner: InMemorySessionStore::with_clock(Arc::new(clock.clone())),
            failing_puts: Arc::new(AtomicUsize::new(0)),
            failing_takes: Arc::new(AtomicUsize::new(0)),
            down: Arc::new(AtomicBool::new(false)),
        }
    }

    fn fail_next_put(&self) {
        self.failing_puts.store(1, Ordering::SeqCst);
    }

    fn fail_next_take(&self) {
        self.failing_takes.store(1, Ordering::SeqCst);
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, counter: Option<&AtomicUsize>) -> Result<(), StoreError> {
        let tripped = counter.is_some_and(|c| {
            c.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        });
        if tripped || self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn put(
        &self,
        id: Uuid,
        record: &SessionRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        self.check(Some(&self.failing_puts))?;
        self.inner.put(id, record, ttl_seconds).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        self.check(None)?;
        self.inner.get(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check(None)?;
        self.inner.delete(id).await
    }

    async fn take(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        self.check(Some(&self.failing_takes))?;
        self.inner.take(id).await
    }
}

fn flaky_setup(clock: &ManualClock) -> SessionEngine<FlakyStore> {
    SessionEngine::with_clock(
        SessionConfig::new(SECRET),
        FlakyStore::new(clock),
        Arc::new(clock.clone()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_failed_write_during_refresh_keeps_old_token_usable() {
    let clock = ManualClock::at(T0);
    let engine = flaky_setup(&clock);
    let issued = engine.login(user(1), Some(user(1))).await.unwrap();
    clock.advance(3700);

    engine.store().fail_next_put();
    let err = engine.refresh(&issued.refresh, Payload::new()).await.unwrap_err();
    assert!(matches!(err, SessionError::Store(_)));
    assert!(engine.store().inner.get(issued.session_id).await.unwrap().is_some());

    // Store recovered: the same refresh token still rotates
    let rotated = engine.refresh(&issued.refresh, Payload::new()).await.unwrap();
    assert_uuid_ne(rotated.session_id, issued.session_id, "rotated sid");
    assert_eq!(engine.store().inner.len().await, 1);
}

#[tokio::test]
async fn test_failed_claim_during_refresh_discards_new_record() {
    let clock = ManualClock::at(T0);
    let engine = flaky_setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();
    clock.advance(3700);

    engine.store().fail_next_take();
    let err = engine.refresh(&issued.refresh, Payload::new()).await.unwrap_err();
    assert!(matches!(err, SessionError::Store(_)));

    // Only the original record is left, and it still refreshes
    assert_eq!(engine.store().inner.len().await, 1);
    engine.refresh(&issued.refresh, Payload::new()).await.unwrap();
}

#[tokio::test]
async fn test_store_outage_is_not_unauthorized() {
    let clock = ManualClock::at(T0);
    let engine = flaky_setup(&clock);
    let issued = engine.login(user(1), None).await.unwrap();
    clock.advance(3700);

    engine.store().set_down(true);

    let login = engine.login(user(2), None).await.unwrap_err();
    assert!(matches!(login, SessionError::Store(_)));

    let refresh = engine.refresh(&issued.refresh, Payload::new()).await.unwrap_err();
    assert!(matches!(refresh, SessionError::Store(_)));

    let csrf = engine
        .verify_csrf(issued.session_id, &issued.csrf)
        .await
        .unwrap_err();
    assert!(matches!(csrf, SessionError::Store(_)));

    let logout = engine.logout(&issued.refresh).await.unwrap_err();
    assert!(matches!(logout, SessionError::Store(_)));

    // Nothing was lost while the store was down
    engine.store().set_down(false);
    engine.logout(&issued.refresh).await.unwrap();
}
