//! Shared scratch state for passing values between plugins within one build.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Value = Arc<dyn Any + Send + Sync>;

/// String-keyed store of arbitrary values, scoped to one build.
///
/// Unlike the build cache this is never persisted and holds live values
/// (renderer handles, computed tables). Values are shared behind `Arc`, so a
/// `get` never blocks a concurrent writer for longer than the map lookup.
#[derive(Default)]
pub struct ScratchState {
    values: RwLock<HashMap<String, Value>>,
}

impl ScratchState {
    /// Create an empty scratch state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values
            .write()
            .unwrap()
            .insert(key.into(), Arc::new(value));
    }

    /// Get the value under `key`.
    ///
    /// Returns `None` when the key is missing or holds a different type.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.values.read().unwrap().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Remove the value under `key`. Returns whether a value was present.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove(&self, key: &str) -> bool {
        self.values.write().unwrap().remove(key).is_some()
    }

    /// Whether `key` holds a value of any type.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().unwrap().contains_key(key)
    }

    /// All keys, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for ScratchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchState")
            .field("keys", &self.keys())
            .finish()
    }
}
