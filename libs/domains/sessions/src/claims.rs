use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Application-defined claims merged into an access token (e.g. `user_id`).
pub type Payload = Map<String, Value>;

/// Claim names owned by the engine. Callers cannot set them through a payload.
pub const RESERVED_CLAIMS: [&str; 4] = ["sid", "exp", "typ", "iss"];

/// Distinguishes the two token kinds so neither can stand in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Decoded access token: the caller's payload plus session id and expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sid: Uuid,
    pub exp: i64,
    pub typ: TokenType,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Decoded refresh token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sid: Uuid,
    pub exp: i64,
    pub typ: TokenType,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub refresh_payload: Payload,
}

/// Drop engine-owned claim names from a caller payload.
pub(crate) fn strip_reserved(mut payload: Payload) -> Payload {
    for name in RESERVED_CLAIMS {
        if payload.remove(name).is_some() {
            tracing::debug!(claim = name, "Dropped reserved claim from caller payload");
        }
    }
    payload
}
