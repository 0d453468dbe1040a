//! Secondary indices mapping field values to primary keys.
//!
//! An index exists only once declared. Buckets fill as records are added and
//! are emptied only by [`IndexTable::clear_buckets`]; removing a single entry
//! leaves its key behind in whatever buckets it joined.

use crate::value::{CacheKey, Record, scalar_text};
use indexmap::IndexMap;

type Buckets = IndexMap<String, Vec<CacheKey>>;

/// Named indices for one cache.
#[derive(Debug, Clone, Default)]
pub struct IndexTable {
    indices: IndexMap<String, Buckets>,
}

impl IndexTable {
    /// Declare `name`. Declaring an existing index keeps its buckets.
    pub fn declare(&mut self, name: &str) {
        if !self.indices.contains_key(name) {
            self.indices.insert(name.to_owned(), Buckets::new());
        }
    }

    /// Returns `true` when `name` has been declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Declared index names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(String::as_str)
    }

    /// Append `key` to the bucket of every declared index whose field is a
    /// scalar on `record`.
    pub fn record(&mut self, key: &CacheKey, record: &Record) {
        for (name, buckets) in &mut self.indices {
            let Some(field_text) = record.get(name).and_then(scalar_text) else {
                continue;
            };
            buckets.entry(field_text).or_default().push(key.clone());
        }
    }

    /// Keys stored under `field_value` in index `name`.
    ///
    /// Returns `None` when the index was never declared and an empty slice
    /// when the value has no bucket.
    #[must_use]
    pub fn lookup(&self, name: &str, field_value: &str) -> Option<&[CacheKey]> {
        let buckets = self.indices.get(name)?;
        Some(buckets.get(field_value).map_or(&[], Vec::as_slice))
    }

    /// Empty every bucket while keeping the declared names.
    pub fn clear_buckets(&mut self) {
        for buckets in self.indices.values_mut() {
            buckets.clear();
        }
    }
}
