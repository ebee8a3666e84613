//! Cache-busting fingerprints for generated output files.

use std::collections::BTreeMap;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters.
const FINGERPRINT_LEN: usize = 8;

/// Short content fingerprint: the first 8 hex characters of the SHA-256 digest.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(&digest[..FINGERPRINT_LEN / 2]);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Registry of fingerprints keyed by output path (e.g. `css/site.css`).
///
/// Written by plugins that generate assets and read by whatever emits links
/// to them.
#[derive(Debug, Default)]
pub struct AssetHashes {
    hashes: RwLock<BTreeMap<String, String>>,
}

impl AssetHashes {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` for `path`, replacing any previous value.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set(&self, path: impl Into<String>, hash: impl Into<String>) {
        self.hashes.write().unwrap().insert(path.into(), hash.into());
    }

    /// Fingerprint `bytes`, record it for `path` and return it.
    pub fn register(&self, path: impl Into<String>, bytes: &[u8]) -> String {
        let hash = fingerprint(bytes);
        self.set(path, hash.clone());
        hash
    }

    /// Fingerprint recorded for `path`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.hashes.read().unwrap().get(path).cloned()
    }

    /// Snapshot of every recorded fingerprint, ordered by path.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn all(&self) -> BTreeMap<String, String> {
        self.hashes.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_short_sha256_prefix() {
        // sha256("abc") = ba7816bf...
        assert_eq!(fingerprint(b"abc"), "ba7816bf");
        assert_eq!(fingerprint(b"").len(), 8);
    }

    #[test]
    fn test_register_and_get() {
        let assets = AssetHashes::new();
        let hash = assets.register("css/site.css", b"body{}");

        assert_eq!(assets.get("css/site.css"), Some(hash));
        assert_eq!(assets.get("js/app.js"), None);
    }

    #[test]
    fn test_set_overrides() {
        let assets = AssetHashes::new();
        assets.set("a", "1");
        assets.set("a", "2");
        assets.set("b", "3");

        let all = assets.all();
        assert_eq!(all.get("a").map(String::as_str), Some("2"));
        assert_eq!(all.len(), 2);
    }
}
