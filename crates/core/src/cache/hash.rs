//! Request fingerprints used as store keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Normalized identity of a request.
///
/// Two requests with the same fingerprint are interchangeable for caching.
/// The digest covers the uppercased method, the canonical URL and the vary
/// headers (names lowercased and sorted, so header order never matters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a request.
    ///
    /// `url` must already be canonical; `vary` holds only the headers that
    /// participate in the identity.
    pub fn compute(method: &str, url: &str, vary: &[(String, String)]) -> Self {
        let mut headers: Vec<(String, &str)> =
            vary.iter().map(|(name, value)| (name.to_ascii_lowercase(), value.trim())).collect();
        headers.sort();

        let mut hasher = Sha256::new();
        hasher.update(method.to_ascii_uppercase().as_bytes());
        hasher.update(b"\n");
        hasher.update(url.as_bytes());
        for (name, value) in headers {
            hasher.update(b"\n");
            hasher.update(name.as_bytes());
            hasher.update(b":");
            hasher.update(value.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an existing hex digest, e.g. one read back from the store.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, crate::Error> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidInput(format!("invalid fingerprint: {hex}")));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
