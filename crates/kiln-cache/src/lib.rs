//! Build cache for kiln.
//!
//! Plugins use the cache to skip recomputing a derived artifact when the
//! bytes that determine it are unchanged. Two traits form the core API:
//!
//! - [`Cache`]: Factory for namespaced cache buckets
//! - [`CacheBucket`]: Store keyed by document identity, validated by content hash
//!
//! A lookup hits only when the stored content hash equals the requested one.
//! Any mismatch is a miss, never a stale hit. The cache is advisory: callers
//! always keep a path that recomputes the value, and no cache operation can fail.
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: In-process implementation shared across plugins of one build
//! - [`FileCache`]: File-based implementation persisted across builds
//!
//! # Example
//!
//! ```
//! use kiln_cache::{Cache, MemoryCache, content_hash};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("link_hrefs");
//! let hash = content_hash(b"<a href=\"/about/\">About</a>");
//!
//! bucket.set("posts/hello.md", &hash, b"[\"/about/\"]");
//! assert_eq!(bucket.get("posts/hello.md", &hash), Some(b"[\"/about/\"]".to_vec()));
//! assert_eq!(bucket.get("posts/hello.md", "other-hash"), None);
//! ```

mod ext;
mod file;
mod memory;

pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

use sha2::{Digest, Sha256};

/// A namespace within a [`Cache`].
///
/// Each bucket maps a stable document identity (usually the source path) to a
/// derived value together with the content hash of the input that produced it.
/// A hit requires both the identity and the hash to match exactly.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `Some(value)` if `identity` exists **and** was stored with the
    /// same `hash`. Returns `None` on cache miss or hash mismatch.
    ///
    /// # Arguments
    ///
    /// * `identity` - Stable identity of the source document (e.g., its path)
    /// * `hash` - Content hash of the bytes that determine the value
    fn get(&self, identity: &str, hash: &str) -> Option<Vec<u8>>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same identity, regardless of the
    /// previous hash. Failures are swallowed: the cache is optional.
    fn set(&self, identity: &str, hash: &str, value: &[u8]);
}

/// Factory for namespaced [`CacheBucket`]s.
///
/// Buckets produced for different namespaces are isolated from each other,
/// so two plugins caching different artifacts for the same document never
/// observe each other's values.
pub trait Cache: Send + Sync {
    /// Open or create the bucket for `namespace`.
    ///
    /// Calling `bucket` multiple times with the same name returns handles that
    /// share the same underlying storage.
    ///
    /// # Arguments
    ///
    /// * `namespace` - Artifact namespace (e.g., "markdown", "link_hrefs")
    fn bucket(&self, namespace: &str) -> Box<dyn CacheBucket>;
}

/// Compute the content hash of `bytes`.
///
/// Hex-encoded SHA-256. Collision resistance is what matters here (equal
/// hashes must mean equal inputs for reproducible builds), not secrecy.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
///
/// Every `get` returns `None`; every `set` is silently discarded.
/// Used as the bucket type for [`NullCache`].
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _identity: &str, _hash: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _identity: &str, _hash: &str, _value: &[u8]) {}
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled. All lookups return `None`.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _namespace: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
