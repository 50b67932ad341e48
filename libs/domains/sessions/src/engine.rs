use crate::claims::{AccessClaims, Payload, RefreshClaims, TokenType, strip_reserved};
use crate::clock::{Clock, SystemClock};
use crate::codec::TokenCodec;
use crate::config::SessionConfig;
use crate::csrf::{self, CsrfSecret};
use crate::error::{SessionError, SessionResult};
use crate::store::{SessionRecord, SessionStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tokens handed to the client after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
    /// Masked CSRF token for the new session
    pub csrf: String,
    #[serde(skip)]
    pub session_id: Uuid,
    pub access_expires_at: i64,
    pub refresh_expires_at: i64,
}

/// Passed to the early-refresh hook: a refresh arrived while the stored
/// access token was still valid, which legitimate clients do not do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyRefresh {
    pub session_id: Uuid,
    pub access_expires_at: i64,
}

/// Issues, rotates and verifies sessions.
///
/// The engine holds no mutable state of its own; cloning is cheap and every
/// clone shares the same store, codec and clock.
pub struct SessionEngine<S: SessionStore> {
    store: Arc<S>,
    codec: Arc<TokenCodec>,
    config: Arc<SessionConfig>,
    clock: Arc<dyn Clock>,
}

impl<S: SessionStore> Clone for SessionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: Arc::clone(&self.codec),
            config: Arc::clone(&self.config),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: SessionStore> SessionEngine<S> {
    pub fn new(config: SessionConfig, store: S) -> SessionResult<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: SessionConfig,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<Self> {
        config.validate()?;
        let codec = TokenCodec::new(&config, Arc::clone(&clock)).map_err(SessionError::Token)?;

        info!(
            algorithm = ?config.algorithm,
            access_ttl = config.access_ttl,
            refresh_ttl = config.refresh_ttl,
            "Session engine initialized"
        );

        Ok(Self {
            store: Arc::new(store),
            codec: Arc::new(codec),
            config: Arc::new(config),
            clock,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new session lineage.
    pub async fn login(
        &self,
        payload: Payload,
        refresh_payload: Option<Payload>,
    ) -> SessionResult<IssuedTokens> {
        let payload = strip_reserved(payload);
        let refresh_payload = refresh_payload.map(strip_reserved).unwrap_or_default();

        let issued = self.open_session(payload, refresh_payload).await?;
        info!(session_id = %issued.session_id, "Session opened");
        Ok(issued)
    }

    /// Rotate a session. See [`Self::refresh_with_hook`].
    pub async fn refresh(
        &self,
        refresh_token: &str,
        new_access_payload: Payload,
    ) -> SessionResult<IssuedTokens> {
        self.refresh_with_hook(refresh_token, new_access_payload, |_| {})
            .await
    }

    /// Rotate a session: the presented refresh token's record is consumed
    /// and a new session id, CSRF secret and token pair are issued.
    ///
    /// A refresh token whose record is gone (expired, logged out, or already
    /// rotated by someone else) is `Unauthorized`. That is how reuse of a
    /// stolen refresh token is caught.
    ///
    /// The new record is written before the old one is claimed, so a store
    /// failure leaves the old refresh token usable for a retry. Of several
    /// concurrent refreshes of one token only the caller whose `take`
    /// returns the old record succeeds; the others discard their new record.
    ///
    /// If the stored access token has not expired yet, `on_early_refresh` is
    /// called once, by the winning caller, before the new tokens are
    /// returned. The refresh still proceeds.
    ///
    /// The new access payload is the stored refresh payload overlaid with
    /// `new_access_payload`; the refresh payload itself carries forward
    /// unchanged.
    pub async fn refresh_with_hook<F>(
        &self,
        refresh_token: &str,
        new_access_payload: Payload,
        on_early_refresh: F,
    ) -> SessionResult<IssuedTokens>
    where
        F: FnOnce(EarlyRefresh) + Send,
    {
        let claims: RefreshClaims = self.decode(refresh_token, TokenType::Refresh)?;
        let record = self.live_record(claims.sid).await?;

        let mut access_payload = record.refresh_payload.clone();
        access_payload.extend(strip_reserved(new_access_payload));

        let issued = self
            .open_session(access_payload, record.refresh_payload)
            .await?;

        let claimed = match self.store.take(claims.sid).await {
            Ok(Some(claimed)) => claimed,
            Ok(None) => {
                debug!(
                    session_id = %claims.sid,
                    "Session superseded by a concurrent refresh"
                );
                self.discard(issued.session_id).await;
                return Err(SessionError::Unauthorized);
            }
            Err(e) => {
                self.discard(issued.session_id).await;
                return Err(e.into());
            }
        };

        let now = self.clock.now();
        if now < claimed.access_expires_at {
            warn!(
                session_id = %claims.sid,
                access_expires_at = claimed.access_expires_at,
                "Refresh requested before access token expiry"
            );
            on_early_refresh(EarlyRefresh {
                session_id: claims.sid,
                access_expires_at: claimed.access_expires_at,
            });
        }

        info!(
            old_session_id = %claims.sid,
            session_id = %issued.session_id,
            "Session rotated"
        );
        Ok(issued)
    }

    /// Verify an access token. Stateless: the store is not consulted.
    pub fn verify_access(&self, access_token: &str) -> SessionResult<AccessClaims> {
        self.decode(access_token, TokenType::Access)
    }

    /// Check a masked CSRF token against the session's stored secret.
    pub async fn verify_csrf(&self, session_id: Uuid, candidate: &str) -> SessionResult<bool> {
        let record = self.live_record(session_id).await?;
        Ok(csrf::verify(candidate, &record.csrf_secret))
    }

    /// A freshly masked CSRF token for an existing session.
    pub async fn issue_csrf(&self, session_id: Uuid) -> SessionResult<String> {
        let record = self.live_record(session_id).await?;
        Ok(csrf::mask(&record.csrf_secret))
    }

    /// End the session named by a refresh token. Its access token stays
    /// valid until expiry but can no longer pass CSRF checks or refresh.
    pub async fn logout(&self, refresh_token: &str) -> SessionResult<()> {
        let claims: RefreshClaims = self.decode(refresh_token, TokenType::Refresh)?;

        if !self.store.delete(claims.sid).await? {
            debug!(session_id = %claims.sid, "Logout for unknown session");
            return Err(SessionError::Unauthorized);
        }

        info!(session_id = %claims.sid, "Session closed");
        Ok(())
    }

    async fn live_record(&self, session_id: Uuid) -> SessionResult<SessionRecord> {
        self.store.get(session_id).await?.ok_or_else(|| {
            debug!(session_id = %session_id, "No live session record");
            SessionError::Unauthorized
        })
    }

    /// Best-effort removal of a record minted by a refresh that lost. A
    /// leftover lapses with its TTL.
    async fn discard(&self, session_id: Uuid) {
        if let Err(e) = self.store.delete(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to discard unused session record");
        }
    }

    /// Mint a session id and secret, sign both tokens, then persist the
    /// record. Signing first means an encode failure leaves nothing behind.
    async fn open_session(
        &self,
        payload: Payload,
        refresh_payload: Payload,
    ) -> SessionResult<IssuedTokens> {
        let session_id = Uuid::new_v4();
        let now = self.clock.now();
        let access_expires_at = now + self.config.access_ttl;
        let refresh_expires_at = now + self.config.refresh_ttl;

        let access = self
            .codec
            .encode(&AccessClaims {
                sid: session_id,
                exp: access_expires_at,
                typ: TokenType::Access,
                payload,
            })
            .map_err(SessionError::Token)?;

        let refresh = self
            .codec
            .encode(&RefreshClaims {
                sid: session_id,
                exp: refresh_expires_at,
                typ: TokenType::Refresh,
                refresh_payload: refresh_payload.clone(),
            })
            .map_err(SessionError::Token)?;

        let record = SessionRecord {
            csrf_secret: CsrfSecret::generate(),
            access_expires_at,
            refresh_payload,
        };
        self.store
            .put(session_id, &record, self.config.refresh_ttl.unsigned_abs())
            .await?;

        Ok(IssuedTokens {
            access,
            refresh,
            csrf: csrf::mask(&record.csrf_secret),
            session_id,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Decode a token of the expected type, collapsing every failure to
    /// `Unauthorized`.
    pub(crate) fn decode<T>(&self, token: &str, expected: TokenType) -> SessionResult<T>
    where
        T: serde::de::DeserializeOwned + HasTokenType,
    {
        let claims: T = self.codec.decode(token).map_err(|e| {
            debug!(error = %e, ?expected, "Token rejected");
            SessionError::Unauthorized
        })?;

        if claims.token_type() != expected {
            debug!(?expected, found = ?claims.token_type(), "Token of the wrong type");
            return Err(SessionError::Unauthorized);
        }
        Ok(claims)
    }
}

pub(crate) trait HasTokenType {
    fn token_type(&self) -> TokenType;
}

impl HasTokenType for AccessClaims {
    fn token_type(&self) -> TokenType {
        self.typ
    }
}

impl HasTokenType for RefreshClaims {
    fn token_type(&self) -> TokenType {
        self.typ
    }
}
