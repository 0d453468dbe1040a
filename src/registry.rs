//! Named caches of one scenario.
//!
//! The registry owns every cache a scenario uses and is the lookup table that
//! referential caches resolve their pointers through. Caches are kept in
//! registration order; [`CacheRegistry::cleanup_order`] reorders them by
//! teardown rank.

use crate::cache::FixtureCache;
use crate::error::{CacheError, CacheResult};
use indexmap::IndexMap;
use std::fmt;

/// Caches of one scenario, addressed by name.
#[derive(Default)]
pub struct CacheRegistry {
    caches: IndexMap<String, Box<dyn FixtureCache>>,
}

impl CacheRegistry {
    /// Add `cache` under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::DuplicateCache`] when the name is taken.
    pub fn register(&mut self, cache: Box<dyn FixtureCache>) -> CacheResult<()> {
        let name = cache.name().to_owned();
        if self.caches.contains_key(&name) {
            return Err(CacheError::DuplicateCache { name });
        }
        tracing::debug!(cache = %name, "registered cache");
        self.caches.insert(name, cache);
        Ok(())
    }

    /// Borrow the cache named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownCache`] when no such cache is registered.
    pub fn get(&self, name: &str) -> CacheResult<&dyn FixtureCache> {
        self.caches
            .get(name)
            .map(|cache| &**cache)
            .ok_or_else(|| unknown(name))
    }

    /// Mutably borrow the cache named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownCache`] when no such cache is registered.
    pub fn get_mut(&mut self, name: &str) -> CacheResult<&mut dyn FixtureCache> {
        match self.caches.get_mut(name) {
            Some(cache) => Ok(&mut **cache),
            None => Err(unknown(name)),
        }
    }

    /// Returns `true` when a cache named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    /// Number of registered caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Registered caches in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn FixtureCache + 'static)> {
        self.caches.values().map(|cache| &**cache)
    }

    /// Names in teardown order: ascending rank, registration order on ties.
    #[must_use]
    pub fn cleanup_order(&self) -> Vec<String> {
        let mut ranked: Vec<(u8, &String)> = self
            .caches
            .iter()
            .map(|(name, cache)| (cache.teardown_rank(), name))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, name)| name.clone()).collect()
    }
}

fn unknown(name: &str) -> CacheError {
    CacheError::UnknownCache {
        name: name.to_owned(),
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("caches", &self.caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in self.cleanup_order() {
            let Some(cache) = self.caches.get(&name) else {
                continue;
            };
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{}", cache.describe())?;
        }
        Ok(())
    }
}
