//! Caches of fixtures that live in the backing system.
//!
//! An [`EntityCache`] is configured by a [`FixtureKind`]. Lookups reload the
//! authoritative record through the [`Driver`] so steps always observe the
//! current state, and [`FixtureCache::clean`] deletes every fixture the
//! scenario created unless it was flagged [`NOCLEAN`].

use super::{CacheContext, CacheStore, FixtureCache, NOCLEAN};
use crate::driver::{Driver, DriverError, FixtureKind};
use crate::error::{CacheError, CacheOp, CacheResult, CleanupFailures, CleanupTarget};
use crate::value::{CacheKey, CachedValue, FieldValue, Record, scalar_text};
use indexmap::{IndexMap, IndexSet};

/// Cache of one kind of backing-system fixture.
#[derive(Debug, Clone)]
pub struct EntityCache {
    store: CacheStore,
    kind: FixtureKind,
    retained: IndexMap<CacheKey, Record>,
}

impl EntityCache {
    /// Create an empty cache of `kind` fixtures named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FixtureKind) -> Self {
        Self {
            store: CacheStore::for_entity(name, kind.entity_type()),
            kind,
            retained: IndexMap::new(),
        }
    }

    /// User accounts cache named `users`.
    #[must_use]
    pub fn users() -> Self {
        Self::new("users", FixtureKind::User)
    }

    /// Content cache named `nodes`.
    #[must_use]
    pub fn nodes() -> Self {
        Self::new("nodes", FixtureKind::Node)
    }

    /// Taxonomy term cache named `terms`.
    #[must_use]
    pub fn terms() -> Self {
        Self::new("terms", FixtureKind::Term)
    }

    /// Role cache named `roles`.
    #[must_use]
    pub fn roles() -> Self {
        Self::new("roles", FixtureKind::Role)
    }

    /// Language cache named `languages`.
    #[must_use]
    pub fn languages() -> Self {
        Self::new("languages", FixtureKind::Language)
    }

    /// Kind of fixture held.
    #[must_use]
    pub const fn kind(&self) -> FixtureKind {
        self.kind
    }

    /// Add a freshly created record under its own primary key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] when the record has no scalar
    /// primary-key field, plus every [`FixtureCache::add`] failure.
    pub fn track(&mut self, record: Record) -> CacheResult<CacheKey> {
        let Some(key) = self.key_for(&record) else {
            let rendered = record
                .get(self.kind.primary_key())
                .map_or_else(String::new, ToString::to_string);
            return Err(self.store.invalid_key(
                CacheOp::Add,
                rendered,
                "record carries no scalar primary key",
            ));
        };
        self.add(key, Some(record))
    }

    fn driver_failure(&self, op: CacheOp, key: &CacheKey, source: DriverError) -> CacheError {
        CacheError::Driver {
            cache: self.store.label(),
            op,
            key: key.clone(),
            source,
        }
    }

    fn splice_retained(&self, key: &CacheKey, record: &mut Record) {
        if let Some(retained) = self.retained.get(key) {
            for (field, value) in retained {
                record.insert(field.clone(), value.clone());
            }
        }
    }

    /// Reload `key` and splice back the fields the backing system cannot
    /// return.
    fn load(&self, key: &CacheKey, op: CacheOp, driver: &dyn Driver) -> CacheResult<Record> {
        let loaded = driver
            .load(self.kind, key)
            .map_err(|source| self.driver_failure(op, key, source))?;
        let Some(mut record) = loaded else {
            return Err(CacheError::Stale {
                cache: self.store.label(),
                op,
                key: key.clone(),
            });
        };
        self.splice_retained(key, &mut record);
        Ok(record)
    }

    /// Whether the record currently stored under `key` carries every
    /// criterion value.
    fn stored_match(&self, key: &CacheKey, criteria: &Record) -> bool {
        let Ok(value) = self.store.get(key.as_str(), CacheOp::Find) else {
            return false;
        };
        value.as_record().is_some_and(|record| {
            criteria.iter().all(|(field, wanted)| {
                record.get(field).and_then(scalar_text) == scalar_text(wanted)
            })
        })
    }

    /// Record handed to [`Driver::delete`] for `key`.
    fn teardown_record(&self, key: &CacheKey, value: &CachedValue) -> Record {
        let mut record = value.as_record().cloned().unwrap_or_default();
        record
            .entry(self.kind.primary_key())
            .or_insert_with(|| FieldValue::String(key.as_str().to_owned()));
        self.splice_retained(key, &mut record);
        record
    }
}

impl FixtureCache for EntityCache {
    fn store(&self) -> &CacheStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut CacheStore {
        &mut self.store
    }

    fn get_entity_type(&self) -> Option<&'static str> {
        Some(self.kind.entity_type())
    }

    fn teardown_rank(&self) -> u8 {
        self.kind.teardown_rank()
    }

    fn add(&mut self, key: CacheKey, value: Option<Record>) -> CacheResult<CacheKey> {
        let mut side_channel = Record::new();
        if let Some(record) = &value {
            for field in self.kind.retained_fields() {
                if let Some(retained) = record.get(*field) {
                    side_channel.insert((*field).to_owned(), retained.clone());
                }
            }
        }
        let key = self.store.add(key, value)?;
        if !side_channel.is_empty() {
            self.retained.insert(key.clone(), side_channel);
        }
        Ok(key)
    }

    fn key_for(&self, record: &Record) -> Option<CacheKey> {
        record
            .get(self.kind.primary_key())
            .and_then(CacheKey::from_scalar)
    }

    fn get(&self, key: &str, cx: &CacheContext<'_>) -> CacheResult<CachedValue> {
        let key = self.store.live_key(key, CacheOp::Get)?.clone();
        self.load(&key, CacheOp::Get, cx.driver())
            .map(CachedValue::Record)
    }

    fn delete_value(&self, key: &str, field: &str, cx: &CacheContext<'_>) -> CacheResult<()> {
        let key = self.store.live_key(key, CacheOp::DeleteValue)?.clone();
        let record = self.load(&key, CacheOp::DeleteValue, cx.driver())?;
        if !record.contains_key(field) {
            return Err(self
                .store
                .field_not_found(CacheOp::DeleteValue, key.as_str(), field));
        }
        let mut changes = Record::new();
        changes.insert(field.to_owned(), FieldValue::Null);
        cx.driver()
            .alter(self.kind, &key, &changes)
            .map_err(|source| self.driver_failure(CacheOp::DeleteValue, &key, source))?;
        tracing::debug!(cache = %self.name(), %key, field, "cleared fixture field");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> CacheResult<Option<CachedValue>> {
        self.retained.shift_remove(key);
        Ok(self.store.detach(key))
    }

    fn find(&self, criteria: &Record, cx: &CacheContext<'_>) -> CacheResult<Vec<CachedValue>> {
        if !self.kind.supports_find() {
            return Err(self.store.unsupported(CacheOp::Find));
        }
        if let Some(field) = criteria
            .keys()
            .find(|field| !self.store.indices().contains(field))
        {
            return Err(CacheError::IndexNotDeclared {
                cache: self.store.label(),
                field: field.clone(),
            });
        }

        let mut candidates: Option<IndexSet<CacheKey>> = None;
        for (field, wanted) in criteria {
            let bucket = scalar_text(wanted)
                .and_then(|text| self.store.indices().lookup(field, &text))
                .unwrap_or_default();
            let narrowed: IndexSet<CacheKey> = match candidates {
                None => bucket.iter().cloned().collect(),
                Some(previous) => previous
                    .into_iter()
                    .filter(|key| bucket.contains(key))
                    .collect(),
            };
            if narrowed.is_empty() {
                return Ok(Vec::new());
            }
            candidates = Some(narrowed);
        }

        // Buckets outlive removals, so a re-added key can sit in a bucket for
        // a value it no longer has.
        let keys: Vec<CacheKey> = match candidates {
            Some(keys) => keys
                .into_iter()
                .filter(|key| self.stored_match(key, criteria))
                .collect(),
            None => self.store.keys().cloned().collect(),
        };
        keys.iter()
            .map(|key| self.get(key.as_str(), cx))
            .collect()
    }

    fn clean(&mut self, driver: &dyn Driver) -> CacheResult<()> {
        if self.count() == 0 {
            return Ok(());
        }

        let mut failures = CleanupFailures::default();
        let mut issued = 0_usize;
        let mut deleted = 0_usize;
        let mut skipped = 0_usize;
        for (key, value) in self.store.entries() {
            if self.store.instruction(key.as_str(), NOCLEAN) == Some(true) {
                tracing::debug!(cache = %self.store.name(), %key, "kept fixture flagged noclean");
                skipped += 1;
                continue;
            }
            issued += 1;
            let record = self.teardown_record(key, value);
            match driver.delete(self.kind, key, &record) {
                Ok(()) => deleted += 1,
                Err(error) => {
                    tracing::warn!(cache = %self.store.name(), %key, %error, "fixture deletion failed");
                    failures.push(CleanupTarget::Fixture(key.clone()), error);
                }
            }
        }
        if self.kind.batches_deletes() && issued > 0 {
            if let Err(error) = driver.process_batch() {
                tracing::warn!(cache = %self.store.name(), %error, "batch flush failed");
                failures.push(CleanupTarget::Batch, error);
            }
        }

        self.store.reset();
        self.retained.clear();
        tracing::info!(
            cache = %self.store.name(),
            deleted,
            skipped,
            failed = failures.len(),
            "cleaned fixture cache"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Cleanup {
                cache: self.store.label(),
                failures,
            })
        }
    }
}
