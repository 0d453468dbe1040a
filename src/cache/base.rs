//! The plain keyed cache.

use super::{CacheStore, FixtureCache};

/// Cache with no backing store: cleaning only drops references.
#[derive(Debug, Clone)]
pub struct CoreCache {
    store: CacheStore,
}

impl CoreCache {
    /// Create an empty cache named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            store: CacheStore::new(name),
        }
    }
}

impl FixtureCache for CoreCache {
    fn store(&self) -> &CacheStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut CacheStore {
        &mut self.store
    }
}
