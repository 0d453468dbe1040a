//! Keyed storage shared by every cache kind.

use super::index::IndexTable;
use crate::error::{CacheError, CacheOp, CacheResult};
use crate::value::{CacheKey, CachedValue, Record};
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;

/// Entries, indices and per-entry instructions of one cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    name: String,
    entity_type: Option<&'static str>,
    entries: IndexMap<CacheKey, CachedValue>,
    indices: IndexTable,
    instructions: IndexMap<CacheKey, BTreeMap<String, bool>>,
}

impl CacheStore {
    /// Create an empty store labelled `name` in diagnostics.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: None,
            entries: IndexMap::new(),
            indices: IndexTable::default(),
            instructions: IndexMap::new(),
        }
    }

    /// Create an empty store for fixtures of `entity_type`.
    #[must_use]
    pub fn for_entity(name: impl Into<String>, entity_type: &'static str) -> Self {
        Self {
            entity_type: Some(entity_type),
            ..Self::new(name)
        }
    }

    /// Registry name of the cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used in diagnostics: `name(entity_type)` for entity caches,
    /// the bare name otherwise.
    #[must_use]
    pub fn label(&self) -> String {
        match self.entity_type {
            Some(entity_type) => format!("{}({entity_type})", self.name),
            None => self.name.clone(),
        }
    }

    /// Declare index namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EmptyIndexList`] when `names` is empty.
    pub fn add_indices(&mut self, names: &[&str]) -> CacheResult<()> {
        if names.is_empty() {
            return Err(CacheError::EmptyIndexList {
                cache: self.label(),
            });
        }
        for name in names {
            self.indices.declare(name);
        }
        Ok(())
    }

    /// Store `value` under `key`, indexing record values.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] for an empty key and
    /// [`CacheError::DuplicateKey`] when the key is already live.
    pub fn insert(&mut self, key: CacheKey, value: CachedValue) -> CacheResult<CacheKey> {
        if key.is_empty() {
            return Err(self.invalid_key(CacheOp::Add, String::new(), "key must not be empty"));
        }
        if self.entries.contains_key(&key) {
            return Err(CacheError::DuplicateKey {
                cache: self.label(),
                key,
            });
        }
        if let CachedValue::Record(record) = &value {
            self.indices.record(&key, record);
        }
        tracing::debug!(cache = %self.name, %key, "cached fixture");
        self.entries.insert(key.clone(), value);
        Ok(key)
    }

    /// Store `key` as its own scalar value, or `record` when given.
    ///
    /// # Errors
    ///
    /// See [`CacheStore::insert`].
    pub fn add(&mut self, key: CacheKey, record: Option<Record>) -> CacheResult<CacheKey> {
        let value = match record {
            Some(record) => CachedValue::Record(record),
            None => CachedValue::Scalar(key.as_str().to_owned()),
        };
        self.insert(key, value)
    }

    /// Returns `true` when `key` is live.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Borrow the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] when `key` is absent.
    pub fn get(&self, key: &str, op: CacheOp) -> CacheResult<&CachedValue> {
        self.entries.get(key).ok_or_else(|| self.not_found(op, key))
    }

    /// Live keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }

    /// Live entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&CacheKey, &CachedValue)> {
        self.entries.iter()
    }

    /// Number of live entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Keys stored in index `name` under `field_value`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownIndex`] when `name` was never declared.
    pub fn get_index(&self, name: &str, field_value: &str) -> CacheResult<Vec<CacheKey>> {
        self.indices
            .lookup(name, field_value)
            .map(<[CacheKey]>::to_vec)
            .ok_or_else(|| CacheError::UnknownIndex {
                cache: self.label(),
                op: CacheOp::GetIndex,
                index: name.to_owned(),
            })
    }

    /// Borrow the index table.
    #[must_use]
    pub const fn indices(&self) -> &IndexTable {
        &self.indices
    }

    /// Drop `key` and its instructions, leaving index buckets untouched.
    pub fn detach(&mut self, key: &str) -> Option<CachedValue> {
        self.instructions.shift_remove(key);
        let removed = self.entries.shift_remove(key);
        if removed.is_some() {
            tracing::debug!(cache = %self.name, key, "detached fixture");
        }
        removed
    }

    /// Set instruction `name` on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] when `key` is absent.
    pub fn add_instruction(&mut self, key: &str, name: &str, value: bool) -> CacheResult<()> {
        let Some((stored_key, _)) = self.entries.get_key_value(key) else {
            return Err(self.not_found(CacheOp::AddInstruction, key));
        };
        self.instructions
            .entry(stored_key.clone())
            .or_default()
            .insert(name.to_owned(), value);
        Ok(())
    }

    /// Instruction `name` on `key`, or `None` when never set.
    #[must_use]
    pub fn instruction(&self, key: &str, name: &str) -> Option<bool> {
        self.instructions.get(key)?.get(name).copied()
    }

    /// Drop every entry and instruction and empty every index bucket.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.instructions.clear();
        self.indices.clear_buckets();
    }

    pub(crate) fn live_key(&self, key: &str, op: CacheOp) -> CacheResult<&CacheKey> {
        self.entries
            .get_key_value(key)
            .map(|(stored, _)| stored)
            .ok_or_else(|| self.not_found(op, key))
    }

    pub(crate) fn not_found(&self, op: CacheOp, key: &str) -> CacheError {
        CacheError::NotFound {
            cache: self.label(),
            op,
            key: key.to_owned(),
        }
    }

    pub(crate) fn invalid_key(&self, op: CacheOp, key: String, reason: &'static str) -> CacheError {
        CacheError::InvalidKey {
            cache: self.label(),
            op,
            key,
            reason,
        }
    }

    pub(crate) fn field_not_found(&self, op: CacheOp, key: &str, field: &str) -> CacheError {
        CacheError::FieldNotFound {
            cache: self.label(),
            op,
            key: key.to_owned(),
            field: field.to_owned(),
        }
    }

    pub(crate) fn unsupported(&self, op: CacheOp) -> CacheError {
        CacheError::Unsupported {
            cache: self.label(),
            op,
        }
    }
}

impl fmt::Display for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "**************************";
        writeln!(f, "{RULE}")?;
        writeln!(f, " {}", self.name)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Cache entry count: {}", self.count())?;
        writeln!(f, "Keys: {}", self.keys().join(", "))?;
        writeln!(f, "Indices: {}", self.indices.names().join(", "))?;
        write!(f, "{RULE}")
    }
}
