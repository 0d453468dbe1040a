//! Aliases pointing into sibling caches.
//!
//! A [`ReferentialCache`] never owns the fixtures it names. Each entry is an
//! [`AliasRecord`]; lookups resolve the pointer through the scenario's
//! [`CacheRegistry`](crate::registry::CacheRegistry) and delegate to the
//! sibling, so dropping a pointer never touches the pointee.

use super::{CacheContext, CacheStore, FixtureCache};
use crate::error::{CacheError, CacheOp, CacheResult};
use crate::value::{AliasRecord, CacheKey, CachedValue, FieldValue, Record};
use std::collections::BTreeSet;

/// Field of an alias record naming the sibling cache.
pub const ALIAS_CACHE_FIELD: &str = "cache";
/// Field of an alias record carrying the target key.
pub const ALIAS_VALUE_FIELD: &str = "value";

/// Cache of pointers into a fixed set of sibling caches.
#[derive(Debug, Clone)]
pub struct ReferentialCache {
    store: CacheStore,
    siblings: BTreeSet<String>,
}

impl ReferentialCache {
    /// Create an empty cache named `name` that may point into `siblings`.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, siblings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            store: CacheStore::new(name),
            siblings: siblings.into_iter().map(Into::into).collect(),
        }
    }

    /// Store `alias` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownSiblingCache`] when the alias targets a
    /// cache outside the sibling set, plus every [`CacheStore::insert`]
    /// failure.
    pub fn add_alias(&mut self, key: CacheKey, alias: AliasRecord) -> CacheResult<CacheKey> {
        if !self.siblings.contains(&alias.cache_name) {
            return Err(self.unknown_sibling(CacheOp::Add, key.as_str(), &alias.cache_name));
        }
        self.store.insert(key, CachedValue::Alias(alias))
    }

    /// The pointer stored under `key`, unresolved.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] when `key` is absent.
    pub fn target(&self, key: &str) -> CacheResult<&AliasRecord> {
        self.store
            .get(key, CacheOp::Get)?
            .as_alias()
            .ok_or_else(|| self.store.not_found(CacheOp::Get, key))
    }

    /// Resolve `key` to its sibling cache and the key inside it.
    fn apply<'a>(
        &self,
        key: &str,
        op: CacheOp,
        cx: &CacheContext<'a>,
    ) -> CacheResult<(&'a dyn FixtureCache, CacheKey)> {
        let alias = self
            .store
            .get(key, op)?
            .as_alias()
            .ok_or_else(|| self.store.not_found(op, key))?;
        if !self.siblings.contains(&alias.cache_name) {
            return Err(self.unknown_sibling(op, key, &alias.cache_name));
        }
        let sibling = cx
            .registry()
            .get(&alias.cache_name)
            .map_err(|_| self.unknown_sibling(op, key, &alias.cache_name))?;
        // Pointers resolve in one hop; a target that is itself a pointer could
        // loop back here.
        let chained = sibling
            .store()
            .get(alias.target_key.as_str(), op)
            .is_ok_and(|target| target.as_alias().is_some());
        if chained {
            return Err(self.unknown_sibling(op, key, &alias.cache_name));
        }
        Ok((sibling, alias.target_key.clone()))
    }

    fn unknown_sibling(&self, op: CacheOp, key: &str, sibling: &str) -> CacheError {
        CacheError::UnknownSiblingCache {
            cache: self.store.label(),
            op,
            key: key.to_owned(),
            sibling: sibling.to_owned(),
        }
    }

    fn invalid_alias(&self, key: &CacheKey, reason: impl Into<String>) -> CacheError {
        CacheError::InvalidAlias {
            cache: self.store.label(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl FixtureCache for ReferentialCache {
    fn store(&self) -> &CacheStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut CacheStore {
        &mut self.store
    }

    fn teardown_rank(&self) -> u8 {
        0
    }

    fn add_indices(&mut self, _names: &[&str]) -> CacheResult<()> {
        Err(self.store.unsupported(CacheOp::AddIndices))
    }

    fn add(&mut self, key: CacheKey, value: Option<Record>) -> CacheResult<CacheKey> {
        let Some(record) = value else {
            return Err(self.invalid_alias(&key, "an alias needs a value"));
        };
        let Some(FieldValue::String(cache_name)) = record.get(ALIAS_CACHE_FIELD) else {
            return Err(self.invalid_alias(
                &key,
                format!("field '{ALIAS_CACHE_FIELD}' must name a cache"),
            ));
        };
        let Some(target_key) = record.get(ALIAS_VALUE_FIELD).and_then(CacheKey::from_scalar) else {
            return Err(self.invalid_alias(
                &key,
                format!("field '{ALIAS_VALUE_FIELD}' must be a scalar key"),
            ));
        };
        let alias = AliasRecord::new(cache_name.clone(), target_key);
        self.add_alias(key, alias)
    }

    fn get(&self, key: &str, cx: &CacheContext<'_>) -> CacheResult<CachedValue> {
        let (sibling, target) = self.apply(key, CacheOp::Get, cx)?;
        sibling.get(target.as_str(), cx)
    }

    fn get_value(&self, key: &str, field: &str, cx: &CacheContext<'_>) -> CacheResult<FieldValue> {
        let (sibling, target) = self.apply(key, CacheOp::GetValue, cx)?;
        sibling.get_value(target.as_str(), field, cx)
    }

    fn delete_value(&self, key: &str, field: &str, cx: &CacheContext<'_>) -> CacheResult<()> {
        let (sibling, target) = self.apply(key, CacheOp::DeleteValue, cx)?;
        sibling.delete_value(target.as_str(), field, cx)
    }

    fn remove(&mut self, key: &str) -> CacheResult<Option<CachedValue>> {
        Ok(self.store.detach(key))
    }
}
