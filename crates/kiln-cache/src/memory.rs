//! In-process cache implementation.
//!
//! [`MemoryCache`] keeps every entry in a shared map guarded by a reader/writer
//! lock. All buckets opened from the same cache share that map, so a value
//! stored by one plugin handle is visible to every later handle for the same
//! namespace within the build.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Cache, CacheBucket};

/// Stored value with the content hash it was derived from.
struct Entry {
    hash: String,
    value: Vec<u8>,
}

type Entries = HashMap<(String, String), Entry>;

/// In-memory [`Cache`] for a single process.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all namespaces.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns `true` if nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, namespace: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            namespace: namespace.to_owned(),
            entries: Arc::clone(&self.entries),
        })
    }
}

/// A single namespace view over the shared entry map.
struct MemoryCacheBucket {
    namespace: String,
    entries: Arc<RwLock<Entries>>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, identity: &str, hash: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&(self.namespace.clone(), identity.to_owned()))?;
        (entry.hash == hash).then(|| entry.value.clone())
    }

    fn set(&self, identity: &str, hash: &str, value: &[u8]) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.insert(
            (self.namespace.clone(), identity.to_owned()),
            Entry {
                hash: hash.to_owned(),
                value: value.to_vec(),
            },
        );
    }
}
