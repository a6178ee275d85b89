//! Query canonicalization and fingerprinting.
//!
//! Two queries that normalize to the same text share one cache entry.

use sha2::{Digest, Sha256};
use std::fmt;

/// Punctuation removed before comparison.
const STRIPPED_PUNCTUATION: [char; 2] = [',', '.'];

/// Number of hex characters shown as the public cache key.
pub const DISPLAY_KEY_LEN: usize = 8;

/// SHA-256 digest of a normalized query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint raw query text (normalizes first).
    pub fn of(text: &str) -> Self {
        Self::of_normalized(&normalize(text))
    }

    /// Fingerprint text that is already in canonical form.
    pub fn of_normalized(canonical: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix handed back to callers as `cacheKey`.
    pub fn display_key(&self) -> String {
        hex::encode(&self.0[..DISPLAY_KEY_LEN / 2])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Canonicalize a query: lowercase, drop `,` and `.`, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();

    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convenience wrapper over [`Fingerprint::of`].
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint::of(text)
}
