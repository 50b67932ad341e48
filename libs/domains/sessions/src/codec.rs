use crate::clock::Clock;
use crate::config::{SessionConfig, SigningKeys, is_hmac};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token claims rejected: {0}")]
    InvalidClaims(String),

    #[error("Signing key is invalid: {0}")]
    InvalidKey(String),

    #[error("Token encoding failed: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            // A header naming another algorithm is a forgery attempt as far as we care
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                CodecError::InvalidSignature
            }
            ErrorKind::ExpiredSignature => CodecError::Expired,
            ErrorKind::MissingRequiredClaim(claim) => {
                CodecError::InvalidClaims(format!("missing `{}`", claim))
            }
            _ => CodecError::Malformed(err.to_string()),
        }
    }
}

/// Signs and verifies compact JWTs with the configured algorithm.
///
/// Expiry is checked here against the engine [`Clock`] rather than by
/// `jsonwebtoken`, so tests can move time and the leeway stays configurable.
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    leeway: i64,
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Result<Self, CodecError> {
        let (encoding_key, decoding_key) = build_keys(config.algorithm, &config.keys)?;

        let mut validation = Validation::new(config.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            algorithm: config.algorithm,
            encoding_key,
            decoding_key,
            validation,
            leeway: config.leeway as i64,
            issuer: config.issuer.clone(),
            clock,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign a claims set. Adds `iss` when an issuer is configured.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, CodecError> {
        let mut value =
            serde_json::to_value(claims).map_err(|e| CodecError::Encode(e.to_string()))?;

        if let (Some(issuer), Value::Object(map)) = (&self.issuer, &mut value) {
            map.insert("iss".to_string(), Value::String(issuer.clone()));
        }

        let header = Header::new(self.algorithm);
        encode(&header, &value, &self.encoding_key).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Verify signature, issuer and expiry, then deserialize the claims.
    ///
    /// The `iss` claim is consumed here and never reaches `T`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, CodecError> {
        let data = decode::<Value>(token, &self.decoding_key, &self.validation)?;

        let Value::Object(mut claims) = data.claims else {
            return Err(CodecError::Malformed("claims are not an object".into()));
        };

        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| CodecError::InvalidClaims("`exp` is not an integer".into()))?;
        if exp < self.clock.now() - self.leeway {
            return Err(CodecError::Expired);
        }

        let issuer = claims.remove("iss");
        if let Some(expected) = &self.issuer {
            if issuer.as_ref().and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(CodecError::InvalidClaims("unexpected issuer".into()));
            }
        }

        serde_json::from_value(Value::Object(claims))
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

fn build_keys(
    algorithm: Algorithm,
    keys: &SigningKeys,
) -> Result<(EncodingKey, DecodingKey), CodecError> {
    let invalid = |e: jsonwebtoken::errors::Error| CodecError::InvalidKey(e.to_string());

    match keys {
        SigningKeys::Secret(secret) if is_hmac(algorithm) => Ok((
            EncodingKey::from_secret(secret.as_bytes()),
            DecodingKey::from_secret(secret.as_bytes()),
        )),
        SigningKeys::Pem {
            private_key,
            public_key,
        } => {
            let private = private_key.as_bytes();
            let public = public_key.as_bytes();
            match algorithm {
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512 => Ok((
                    EncodingKey::from_rsa_pem(private).map_err(invalid)?,
                    DecodingKey::from_rsa_pem(public).map_err(invalid)?,
                )),
                Algorithm::ES256 | Algorithm::ES384 => Ok((
                    EncodingKey::from_ec_pem(private).map_err(invalid)?,
                    DecodingKey::from_ec_pem(public).map_err(invalid)?,
                )),
                Algorithm::EdDSA => Ok((
                    EncodingKey::from_ed_pem(private).map_err(invalid)?,
                    DecodingKey::from_ed_pem(public).map_err(invalid)?,
                )),
                other => Err(CodecError::InvalidKey(format!(
                    "{:?} cannot be used with a PEM key pair",
                    other
                ))),
            }
        }
        SigningKeys::Secret(_) => Err(CodecError::InvalidKey(format!(
            "{:?} cannot be used with a shared secret",
            algorithm
        ))),
    }
}
