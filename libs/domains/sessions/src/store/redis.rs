use super::{SessionRecord, SessionStore, StoreError};
use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_parse};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Redis connection settings for the session store.
///
/// # Example
///
/// ```
/// use domain_sessions::RedisConfig;
///
/// let config = RedisConfig::new("redis://127.0.0.1:6379").with_database(2);
/// assert_eq!(config.connection_url(), "redis://127.0.0.1:6379/2");
/// ```
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    /// Logical database, appended to the URL path when set
    pub database: Option<u8>,
    /// Connection attempts before giving up at start-up
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every attempt
    pub initial_delay_ms: u64,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
            max_retries: 3,
            initial_delay_ms: 100,
        }
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, initial_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    pub fn connection_url(&self) -> String {
        match self.database {
            Some(db) => format!("{}/{}", self.url.trim_end_matches('/'), db),
            None => self.url.clone(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

impl FromEnv for RedisConfig {
    /// Environment variables:
    /// - `REDIS_URL` or `REDIS_HOST` (required)
    /// - `REDIS_DATABASE` (optional, 0-15)
    /// - `REDIS_CONNECT_RETRIES` (default 3), `REDIS_RETRY_DELAY_MS` (default 100)
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("REDIS_HOST"))
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL or REDIS_HOST".to_string()))?;

        let database = match core_config::env_optional("REDIS_DATABASE") {
            Some(raw) => Some(raw.parse().map_err(|e| ConfigError::ParseError {
                key: "REDIS_DATABASE".to_string(),
                details: format!("{}", e),
            })?),
            None => None,
        };

        Ok(Self {
            url,
            database,
            max_retries: env_parse("REDIS_CONNECT_RETRIES", 3u32)?,
            initial_delay_ms: env_parse("REDIS_RETRY_DELAY_MS", 100u64)?,
        })
    }
}

/// Open a connection manager and verify it with PING
async fn connect(url: &str) -> ::redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let mut manager = ConnectionManager::new(client).await?;
    let _: String = ::redis::cmd("PING").query_async(&mut manager).await?;
    Ok(manager)
}

/// Connect with exponential backoff
async fn connect_with_retry(config: &RedisConfig) -> ::redis::RedisResult<ConnectionManager> {
    let url = config.connection_url();
    let mut delay = Duration::from_millis(config.initial_delay_ms);
    let mut attempt = 0;

    loop {
        match connect(&url).await {
            Ok(manager) => {
                if attempt > 0 {
                    info!(attempt, "Connected to Redis after retrying");
                }
                return Ok(manager);
            }
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Redis connection failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2).min(Duration::from_secs(5));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Redis-backed session store.
///
/// Records are JSON under `{prefix}session:{id}` with `SET EX`, so the key
/// expires together with the refresh token. `take` uses `GETDEL`.
#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(manager: ConnectionManager, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        info!(prefix = %prefix, "Redis session store initialized");
        Self { manager, prefix }
    }

    /// Connect (with retry) and build a store using `prefix` for keys
    pub async fn connect(
        config: &RedisConfig,
        prefix: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let manager = connect_with_retry(config).await?;
        Ok(Self::new(manager, prefix))
    }

    fn key(&self, id: Uuid) -> String {
        format!("{}session:{}", self.prefix, id)
    }

    fn parse(raw: Option<String>) -> Result<Option<SessionRecord>, StoreError> {
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        id: Uuid,
        record: &SessionRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(self.key(id), json, ttl_seconds).await?;

        debug!(session_id = %id, ttl_seconds, "Stored session record");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(self.key(id)).await?;
        Self::parse(raw)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let removed: u64 = conn.del(self.key(id)).await?;
        Ok(removed > 0)
    }

    async fn take(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = ::redis::cmd("GETDEL")
            .arg(self.key(id))
            .query_async(&mut conn)
            .await?;
        Self::parse(raw)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let response: String = ::redis::cmd("PING").query_async(&mut conn).await?;

        if response != "PONG" {
            return Err(StoreError::Unavailable(format!(
                "unexpected PING response: {}",
                response
            )));
        }
        Ok(())
    }
}
