//! Scenario-scoped fixture caches.
//!
//! [`FixtureCache`] carries the base contract shared by every cache as
//! provided methods over a [`CacheStore`]. Concrete caches override only the
//! operations whose meaning differs for them:
//!
//! - [`CoreCache`] keeps the base contract unchanged.
//! - [`EntityCache`] reloads live records through the [`Driver`] and deletes
//!   fixtures on [`FixtureCache::clean`].
//! - [`ReferentialCache`] stores pointers into sibling caches and resolves
//!   them through the [`CacheRegistry`].
//!
//! Lookups that may reach the backing system or a sibling take a
//! [`CacheContext`] so the driver and registry are always passed explicitly.

mod base;
mod entity;
pub mod index;
mod referential;
mod store;

pub use base::CoreCache;
pub use entity::EntityCache;
pub use index::IndexTable;
pub use referential::{ALIAS_CACHE_FIELD, ALIAS_VALUE_FIELD, ReferentialCache};
pub use store::CacheStore;

use crate::driver::Driver;
use crate::error::{CacheOp, CacheResult};
use crate::registry::CacheRegistry;
use crate::value::{CacheKey, CachedValue, FieldValue, Record};

/// Instruction that keeps [`FixtureCache::clean`] from deleting a fixture.
/// The entry itself is still dropped.
pub const NOCLEAN: &str = "noclean";

/// The driver and cache set of the scenario making a lookup.
#[derive(Clone, Copy)]
pub struct CacheContext<'a> {
    driver: &'a dyn Driver,
    registry: &'a CacheRegistry,
}

impl<'a> CacheContext<'a> {
    /// Bundle a driver and registry for one lookup.
    #[must_use]
    pub const fn new(driver: &'a dyn Driver, registry: &'a CacheRegistry) -> Self {
        Self { driver, registry }
    }

    /// Driver of the scenario.
    #[must_use]
    pub const fn driver(&self) -> &'a dyn Driver {
        self.driver
    }

    /// Caches of the scenario.
    #[must_use]
    pub const fn registry(&self) -> &'a CacheRegistry {
        self.registry
    }
}

/// Contract shared by every fixture cache.
pub trait FixtureCache {
    /// Storage backing this cache.
    fn store(&self) -> &CacheStore;

    /// Mutable storage backing this cache.
    fn store_mut(&mut self) -> &mut CacheStore;

    /// Name of the cache, used for registry lookups and diagnostics.
    fn name(&self) -> &str {
        self.store().name()
    }

    /// Entity type of the fixtures held, or `None` for non-entity caches.
    fn get_entity_type(&self) -> Option<&'static str> {
        None
    }

    /// Position in the teardown sequence. Lower ranks are cleaned first.
    fn teardown_rank(&self) -> u8 {
        1
    }

    /// Declare index namespaces. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails when `names` is empty or the cache does not support indices.
    fn add_indices(&mut self, names: &[&str]) -> CacheResult<()> {
        self.store_mut().add_indices(names)
    }

    /// Store `value` under `key`, or the key itself when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Fails when the key is empty or already live.
    fn add(&mut self, key: CacheKey, value: Option<Record>) -> CacheResult<CacheKey> {
        self.store_mut().add(key, value)
    }

    /// [`FixtureCache::add`] with a key taken from a JSON value.
    ///
    /// # Errors
    ///
    /// Fails when the key is not a scalar, plus every [`FixtureCache::add`]
    /// failure.
    fn add_scalar_key(&mut self, key: &FieldValue, value: Option<Record>) -> CacheResult<CacheKey> {
        let Some(cache_key) = CacheKey::from_scalar(key) else {
            return Err(self
                .store()
                .invalid_key(CacheOp::Add, key.to_string(), "key must be a scalar"));
        };
        self.add(cache_key, value)
    }

    /// Primary key carried by a created record, when this cache knows where
    /// to find it.
    fn key_for(&self, _record: &Record) -> Option<CacheKey> {
        None
    }

    /// Value stored under `key`.
    ///
    /// # Errors
    ///
    /// Fails when `key` is absent.
    fn get(&self, key: &str, _cx: &CacheContext<'_>) -> CacheResult<CachedValue> {
        self.store().get(key, CacheOp::Get).cloned()
    }

    /// Field `field` of the value returned by [`FixtureCache::get`].
    ///
    /// # Errors
    ///
    /// Fails when `key` is absent or the value has no such field.
    fn get_value(&self, key: &str, field: &str, cx: &CacheContext<'_>) -> CacheResult<FieldValue> {
        if !self.store().contains(key) {
            return Err(self.store().not_found(CacheOp::GetValue, key));
        }
        self.get(key, cx)?
            .field(field)
            .cloned()
            .ok_or_else(|| self.store().field_not_found(CacheOp::GetValue, key, field))
    }

    /// Clear `field` on the fixture stored under `key`.
    ///
    /// # Errors
    ///
    /// Unsupported unless a cache overrides it.
    fn delete_value(&self, _key: &str, _field: &str, _cx: &CacheContext<'_>) -> CacheResult<()> {
        Err(self.store().unsupported(CacheOp::DeleteValue))
    }

    /// Forget `key` without external side effects.
    ///
    /// # Errors
    ///
    /// Unsupported unless a cache overrides it.
    fn remove(&mut self, _key: &str) -> CacheResult<Option<CachedValue>> {
        Err(self.store().unsupported(CacheOp::Remove))
    }

    /// Values whose fields equal every criterion.
    ///
    /// # Errors
    ///
    /// Unsupported unless a cache overrides it.
    fn find(&self, _criteria: &Record, _cx: &CacheContext<'_>) -> CacheResult<Vec<CachedValue>> {
        Err(self.store().unsupported(CacheOp::Find))
    }

    /// Tear down every entry and empty the cache.
    ///
    /// The base behaviour only drops references; an empty cache returns
    /// without doing anything.
    ///
    /// # Errors
    ///
    /// Fails when a teardown call fails; the cache is emptied regardless.
    fn clean(&mut self, _driver: &dyn Driver) -> CacheResult<()> {
        let removed = self.count();
        if removed == 0 {
            return Ok(());
        }
        self.store_mut().reset();
        tracing::debug!(cache = %self.name(), removed, "dropped cached references");
        Ok(())
    }

    /// Number of live entries.
    fn count(&self) -> usize {
        self.store().count()
    }

    /// Keys stored in index `index` under `field_value`, in insertion order.
    ///
    /// # Errors
    ///
    /// Fails when `index` was never declared.
    fn get_index(&self, index: &str, field_value: &str) -> CacheResult<Vec<CacheKey>> {
        self.store().get_index(index, field_value)
    }

    /// Declared index names, in declaration order.
    fn get_named_indices(&self) -> Vec<String> {
        self.store()
            .indices()
            .names()
            .map(str::to_owned)
            .collect()
    }

    /// Set instruction `name` on `key`.
    ///
    /// # Errors
    ///
    /// Fails when `key` is absent.
    fn add_cache_instruction(&mut self, key: &str, name: &str, value: bool) -> CacheResult<()> {
        self.store_mut().add_instruction(key, name, value)
    }

    /// Instruction `name` on `key`, or `None` when never set.
    fn get_cache_instruction(&self, key: &str, name: &str) -> Option<bool> {
        self.store().instruction(key, name)
    }

    /// Entry count, keys and index names of this cache. Values are left out.
    fn describe(&self) -> String {
        self.store().to_string()
    }
}
