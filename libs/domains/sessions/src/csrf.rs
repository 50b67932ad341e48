//! One-time-pad masking of the per-session CSRF secret.
//!
//! The raw secret never leaves the server. Each [`mask`] call draws a fresh
//! pad, so the same secret produces a different wire value on every
//! response, which keeps compression oracles (BREACH) from recovering it.
//!
//! Wire format: `base64url(pad) || base64url(pad XOR secret)`, both halves
//! unpadded and of equal length.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use subtle::ConstantTimeEq;

/// Length of a freshly generated secret, in bytes
pub const CSRF_SECRET_LEN: usize = 32;

/// Per-session CSRF secret. Serialized as base64url inside session records.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfSecret(Vec<u8>);

impl CsrfSecret {
    /// Draw a new random secret of [`CSRF_SECRET_LEN`] bytes
    pub fn generate() -> Self {
        Self(random_bytes(CSRF_SECRET_LEN))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CsrfSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CsrfSecret(<{} bytes>)", self.0.len())
    }
}

impl Serialize for CsrfSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for CsrfSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD
            .decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|_| rand::random::<u8>()).collect()
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// Produce a masked token for `secret`. Never returns the same string twice
/// in practice.
pub fn mask(secret: &CsrfSecret) -> String {
    let pad = random_bytes(secret.0.len());
    let encoded = xor(&pad, &secret.0);

    let mut token = URL_SAFE_NO_PAD.encode(&pad);
    token.push_str(&URL_SAFE_NO_PAD.encode(&encoded));
    token
}

/// Recover the secret from a masked token, or `None` if it is not one.
pub fn unmask(token: &str) -> Option<CsrfSecret> {
    if token.is_empty() || token.len() % 2 != 0 || !token.is_ascii() {
        return None;
    }

    let (pad, encoded) = token.split_at(token.len() / 2);
    let pad = URL_SAFE_NO_PAD.decode(pad).ok()?;
    let encoded = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    if pad.len() != encoded.len() {
        return None;
    }

    Some(CsrfSecret(xor(&pad, &encoded)))
}

/// Check a candidate masked token against the stored secret in constant time.
pub fn verify(candidate: &str, secret: &CsrfSecret) -> bool {
    match unmask(candidate) {
        Some(unmasked) => unmasked.0.ct_eq(&secret.0).into(),
        None => false,
    }
}
