//! Extension trait for [`CacheBucket`] with typed convenience methods.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed convenience methods for [`CacheBucket`].
///
/// Provides `get_json`/`set_json` for serde-serializable types and
/// `get_string`/`set_string` for UTF-8 strings, through a blanket impl so
/// that [`CacheBucket`] stays object-safe and implementors only handle bytes.
///
/// A value that fails to decode is reported as a miss, which sends the
/// caller down its recompute path.
///
/// # Example
///
/// ```
/// use kiln_cache::{Cache, CacheBucketExt, MemoryCache};
///
/// let cache = MemoryCache::new();
/// let bucket = cache.bucket("link_hrefs");
///
/// bucket.set_json("posts/a.md", "h1", &vec!["/about/".to_owned()]);
/// let hrefs: Option<Vec<String>> = bucket.get_json("posts/a.md", "h1");
/// assert_eq!(hrefs, Some(vec!["/about/".to_owned()]));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a JSON-deserialized value from the cache.
    ///
    /// Returns `None` on cache miss, hash mismatch, or deserialization failure.
    fn get_json<T: DeserializeOwned>(&self, identity: &str, hash: &str) -> Option<T> {
        let bytes = self.get(identity, hash)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Store a value as JSON in the cache.
    ///
    /// Silently does nothing if serialization fails.
    fn set_json<T: Serialize>(&self, identity: &str, hash: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.set(identity, hash, &bytes);
        }
    }

    /// Retrieve a cached UTF-8 string.
    ///
    /// Returns `None` on cache miss, hash mismatch, or invalid UTF-8.
    fn get_string(&self, identity: &str, hash: &str) -> Option<String> {
        let bytes = self.get(identity, hash)?;
        String::from_utf8(bytes).ok()
    }

    /// Store a string value in the cache.
    fn set_string(&self, identity: &str, hash: &str, value: &str) {
        self.set(identity, hash, value.as_bytes());
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
