//! Session engine configuration.
//!
//! One immutable [`SessionConfig`] is built at start-up, either by hand or
//! through [`FromEnv`], and handed to [`crate::SessionEngine::new`].

use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use jsonwebtoken::Algorithm;
use std::fmt;
use std::str::FromStr;

/// Access token lifetime in seconds (1 hour)
pub const DEFAULT_ACCESS_TTL: i64 = 3600;
/// Refresh token and session record lifetime in seconds (7 days)
pub const DEFAULT_REFRESH_TTL: i64 = 604800;
/// Namespace for session keys in a shared store
pub const DEFAULT_KEY_PREFIX: &str = "jwt_auth:";
/// Minimum length of an HMAC signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Key material for the configured algorithm.
#[derive(Clone)]
pub enum SigningKeys {
    /// Shared secret for HS256/HS384/HS512
    Secret(String),
    /// PEM-encoded key pair for RSA, RSA-PSS, ECDSA or EdDSA
    Pem {
        private_key: String,
        public_key: String,
    },
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKeys::Secret(_) => f.write_str("Secret(<redacted>)"),
            SigningKeys::Pem { .. } => f.write_str("Pem(<redacted>)"),
        }
    }
}

/// Header and cookie names the adapter boundary looks tokens up under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenNames {
    pub access_header: String,
    pub access_cookie: String,
    pub refresh_header: String,
    pub refresh_cookie: String,
    pub csrf_header: String,
}

impl Default for TokenNames {
    fn default() -> Self {
        Self {
            access_header: "Authorization".to_string(),
            access_cookie: "jwt_access".to_string(),
            refresh_header: "X-Refresh-Token".to_string(),
            refresh_cookie: "jwt_refresh".to_string(),
            csrf_header: "X-CSRF-Token".to_string(),
        }
    }
}

impl FromEnv for TokenNames {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            access_header: env_or_default("SESSION_ACCESS_HEADER", &defaults.access_header),
            access_cookie: env_or_default("SESSION_ACCESS_COOKIE", &defaults.access_cookie),
            refresh_header: env_or_default("SESSION_REFRESH_HEADER", &defaults.refresh_header),
            refresh_cookie: env_or_default("SESSION_REFRESH_COOKIE", &defaults.refresh_cookie),
            csrf_header: env_or_default("SESSION_CSRF_HEADER", &defaults.csrf_header),
        })
    }
}

/// Session engine configuration.
///
/// # Example
///
/// ```
/// use domain_sessions::SessionConfig;
///
/// let config = SessionConfig::new("this-is-a-valid-secret-with-32-chars!")
///     .with_access_ttl(900)
///     .with_leeway(5);
/// assert_eq!(config.refresh_ttl, 604800);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub algorithm: Algorithm,
    pub keys: SigningKeys,
    /// Access token lifetime in seconds
    pub access_ttl: i64,
    /// Refresh token lifetime in seconds; also the session record TTL
    pub refresh_ttl: i64,
    /// Clock skew tolerated when checking `exp`, in seconds
    pub leeway: u64,
    /// When set, written as `iss` and required on decode
    pub issuer: Option<String>,
    pub token_names: TokenNames,
    pub key_prefix: String,
}

impl SessionConfig {
    /// HS256 configuration with default lifetimes.
    ///
    /// # Panics
    /// Panics if the secret is shorter than 32 characters.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        assert!(
            secret.len() >= MIN_SECRET_LEN,
            "JWT secret must be at least 32 characters"
        );
        Self::with_keys(Algorithm::HS256, SigningKeys::Secret(secret))
    }

    /// Configuration for an asymmetric algorithm with PEM key material.
    pub fn with_key_pair(
        algorithm: Algorithm,
        private_key: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self::with_keys(
            algorithm,
            SigningKeys::Pem {
                private_key: private_key.into(),
                public_key: public_key.into(),
            },
        )
    }

    fn with_keys(algorithm: Algorithm, keys: SigningKeys) -> Self {
        Self {
            algorithm,
            keys,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            leeway: 0,
            issuer: None,
            token_names: TokenNames::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_access_ttl(mut self, seconds: i64) -> Self {
        self.access_ttl = seconds;
        self
    }

    pub fn with_refresh_ttl(mut self, seconds: i64) -> Self {
        self.refresh_ttl = seconds;
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_token_names(mut self, names: TokenNames) -> Self {
        self.token_names = names;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Check lifetimes and that the key kind matches the algorithm family.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_ttl <= 0 {
            return Err(ConfigError::Invalid("access TTL must be positive".into()));
        }
        if self.refresh_ttl < self.access_ttl {
            return Err(ConfigError::Invalid(
                "refresh TTL must not be shorter than access TTL".into(),
            ));
        }

        match (&self.keys, is_hmac(self.algorithm)) {
            (SigningKeys::Secret(secret), true) if secret.len() < MIN_SECRET_LEN => {
                Err(ConfigError::Invalid(format!(
                    "JWT secret must be at least {} characters (got {})",
                    MIN_SECRET_LEN,
                    secret.len()
                )))
            }
            (SigningKeys::Secret(_), true) | (SigningKeys::Pem { .. }, false) => Ok(()),
            (SigningKeys::Secret(_), false) => Err(ConfigError::Invalid(format!(
                "{:?} requires a PEM key pair",
                self.algorithm
            ))),
            (SigningKeys::Pem { .. }, true) => Err(ConfigError::Invalid(format!(
                "{:?} requires a shared secret",
                self.algorithm
            ))),
        }
    }
}

/// HMAC algorithms sign with a shared secret; everything else takes a key pair.
pub(crate) fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

/// PEM material may be given inline or as a path to a file.
fn read_pem(key: &str) -> Result<String, ConfigError> {
    let value = core_config::env_required(key)?;
    if value.trim_start().starts_with("-----BEGIN") {
        return Ok(value);
    }

    std::fs::read_to_string(value.trim()).map_err(|e| ConfigError::ParseError {
        key: key.to_string(),
        details: format!("failed to read PEM file '{}': {}", value.trim(), e),
    })
}

impl FromEnv for SessionConfig {
    /// Environment variables:
    /// - `JWT_ALGORITHM` (default `HS256`)
    /// - `JWT_SECRET` (required for HS*) - at least 32 characters
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY` (required otherwise) - PEM text or file path
    /// - `JWT_ACCESS_TTL`, `JWT_REFRESH_TTL`, `JWT_LEEWAY` - seconds
    /// - `JWT_ISSUER` (optional)
    /// - `SESSION_KEY_PREFIX` (default `jwt_auth:`)
    /// - `SESSION_*_HEADER` / `SESSION_*_COOKIE` - see [`TokenNames`]
    fn from_env() -> Result<Self, ConfigError> {
        let algorithm_name = env_or_default("JWT_ALGORITHM", "HS256");
        let algorithm =
            Algorithm::from_str(algorithm_name.trim()).map_err(|e| ConfigError::ParseError {
                key: "JWT_ALGORITHM".to_string(),
                details: e.to_string(),
            })?;

        let keys = if is_hmac(algorithm) {
            SigningKeys::Secret(core_config::env_required("JWT_SECRET")?)
        } else {
            SigningKeys::Pem {
                private_key: read_pem("JWT_PRIVATE_KEY")?,
                public_key: read_pem("JWT_PUBLIC_KEY")?,
            }
        };

        let config = Self {
            algorithm,
            keys,
            access_ttl: env_parse("JWT_ACCESS_TTL", DEFAULT_ACCESS_TTL)?,
            refresh_ttl: env_parse("JWT_REFRESH_TTL", DEFAULT_REFRESH_TTL)?,
            leeway: env_parse("JWT_LEEWAY", 0u64)?,
            issuer: env_optional("JWT_ISSUER"),
            token_names: TokenNames::from_env()?,
            key_prefix: env_or_default("SESSION_KEY_PREFIX", DEFAULT_KEY_PREFIX),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "this-is-a-valid-secret-with-32-chars!";

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new(SECRET);
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.access_ttl, 3600);
        assert_eq!(config.refresh_ttl, 604800);
        assert_eq!(config.leeway, 0);
        assert_eq!(config.key_prefix, "jwt_auth:");
        assert_eq!(config.token_names.access_header, "Authorization");
        assert_eq!(config.token_names.access_cookie, "jwt_access");
        assert_eq!(config.token_names.refresh_header, "X-Refresh-Token");
        assert_eq!(config.token_names.refresh_cookie, "jwt_refresh");
        assert_eq!(config.token_names.csrf_header, "X-CSRF-Token");
    }

    #[test]
    #[should_panic(expected = "JWT secret must be at least 32 characters")]
    fn test_session_config_new_too_short() {
        SessionConfig::new("short");
    }

    #[test]
    fn test_validate_rejects_refresh_shorter_than_access() {
        let config = SessionConfig::new(SECRET)
            .with_access_ttl(600)
            .with_refresh_ttl(60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_key_kind() {
        let config = SessionConfig::with_key_pair(Algorithm::HS256, "a", "b");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shared secret"));

        let mut config = SessionConfig::new(SECRET);
        config.algorithm = Algorithm::RS256;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PEM key pair"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = SessionConfig::new(SECRET);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("JWT_ALGORITHM", None),
                ("JWT_ACCESS_TTL", None),
                ("JWT_REFRESH_TTL", None),
                ("JWT_ISSUER", None),
                ("SESSION_KEY_PREFIX", None),
                ("SESSION_CSRF_HEADER", None),
            ],
            || {
                let config = SessionConfig::from_env().unwrap();
                assert_eq!(config.algorithm, Algorithm::HS256);
                assert_eq!(config.access_ttl, DEFAULT_ACCESS_TTL);
                assert_eq!(config.issuer, None);
                assert_eq!(config.token_names, TokenNames::default());
            },
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("JWT_ALGORITHM", Some("HS512")),
                ("JWT_ACCESS_TTL", Some("300")),
                ("JWT_REFRESH_TTL", Some("86400")),
                ("JWT_LEEWAY", Some("10")),
                ("JWT_ISSUER", Some("sessions-test")),
                ("SESSION_KEY_PREFIX", Some("app1:")),
                ("SESSION_CSRF_HEADER", Some("X-XSRF-Token")),
            ],
            || {
                let config = SessionConfig::from_env().unwrap();
                assert_eq!(config.algorithm, Algorithm::HS512);
                assert_eq!(config.access_ttl, 300);
                assert_eq!(config.refresh_ttl, 86400);
                assert_eq!(config.leeway, 10);
                assert_eq!(config.issuer.as_deref(), Some("sessions-test"));
                assert_eq!(config.key_prefix, "app1:");
                assert_eq!(config.token_names.csrf_header, "X-XSRF-Token");
            },
        );
    }

    #[test]
    fn test_from_env_missing_secret() {
        temp_env::with_vars(
            [("JWT_SECRET", None::<&str>), ("JWT_ALGORITHM", None)],
            || {
                let err = SessionConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("JWT_SECRET"));
            },
        );
    }

    #[test]
    fn test_from_env_short_secret() {
        temp_env::with_vars(
            [("JWT_SECRET", Some("short")), ("JWT_ALGORITHM", None)],
            || {
                let err = SessionConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("32 characters"));
            },
        );
    }

    #[test]
    fn test_from_env_bad_ttl() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("JWT_ALGORITHM", None),
                ("JWT_ACCESS_TTL", Some("an hour")),
            ],
            || {
                let err = SessionConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("JWT_ACCESS_TTL"));
            },
        );
    }

    #[test]
    fn test_from_env_unknown_algorithm() {
        temp_env::with_vars(
            [("JWT_SECRET", Some(SECRET)), ("JWT_ALGORITHM", Some("none"))],
            || {
                let err = SessionConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("JWT_ALGORITHM"));
            },
        );
    }
}
