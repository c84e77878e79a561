//! Template fingerprints.
//!
//! A SHA-256 digest of the template body identifies a template revision in
//! console output and in staged object keys.

use sha2::{Digest, Sha256};

/// Computes template digests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateHasher;

impl TemplateHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the hex-encoded SHA-256 digest of a template body.
    #[must_use]
    pub fn digest(&self, body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(body);
        hex::encode(hasher.finalize())
    }

    /// Returns the first 12 characters of a digest.
    #[must_use]
    pub fn short_digest<'a>(&self, digest: &'a str) -> &'a str {
        &digest[..12.min(digest.len())]
    }
}
