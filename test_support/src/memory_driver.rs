//! In-memory stand-in for the backing system.

use fixture_cache::driver::{Driver, DriverError, FixtureKind};
use fixture_cache::value::{CacheKey, FieldValue, Record};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// A call received by [`MemoryDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    /// [`Driver::load`].
    Load(FixtureKind, CacheKey),
    /// [`Driver::delete`] with the record it was given.
    Delete(FixtureKind, CacheKey, Record),
    /// [`Driver::alter`] with the requested changes.
    Alter(FixtureKind, CacheKey, Record),
    /// [`Driver::process_batch`].
    ProcessBatch,
    /// [`Driver::run_cron`].
    RunCron,
    /// [`Driver::clear_cache`].
    ClearCache,
}

/// Driver that keeps fixtures in memory and records every call.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    records: RefCell<HashMap<(FixtureKind, CacheKey), Record>>,
    rejected: RefCell<HashSet<(FixtureKind, CacheKey)>>,
    batch_failure: RefCell<Option<String>>,
    calls: RefCell<Vec<DriverCall>>,
}

impl MemoryDriver {
    /// Create a driver with no fixtures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as if the backing system had just created it.
    ///
    /// Returns the key read from the kind's primary-key field.
    ///
    /// # Panics
    ///
    /// Panics when the record has no scalar primary key.
    pub fn create(&self, kind: FixtureKind, record: Record) -> CacheKey {
        let key = record
            .get(kind.primary_key())
            .and_then(CacheKey::from_scalar)
            .unwrap_or_else(|| panic!("{kind} record has no '{}'", kind.primary_key()));
        self.records.borrow_mut().insert((kind, key.clone()), record);
        key
    }

    /// Delete a fixture behind the cache's back.
    pub fn forget(&self, kind: FixtureKind, key: &CacheKey) {
        self.records.borrow_mut().remove(&(kind, key.clone()));
    }

    /// Returns `true` when the backing system still holds the fixture.
    #[must_use]
    pub fn exists(&self, kind: FixtureKind, key: &CacheKey) -> bool {
        self.records.borrow().contains_key(&(kind, key.clone()))
    }

    /// Current backing record of a fixture.
    #[must_use]
    pub fn stored(&self, kind: FixtureKind, key: &CacheKey) -> Option<Record> {
        self.records.borrow().get(&(kind, key.clone())).cloned()
    }

    /// Make deleting this fixture fail.
    pub fn reject_delete(&self, kind: FixtureKind, key: CacheKey) {
        self.rejected.borrow_mut().insert((kind, key));
    }

    /// Make every batch flush fail with `reason`.
    pub fn fail_batches(&self, reason: &str) {
        *self.batch_failure.borrow_mut() = Some(reason.to_owned());
    }

    /// Calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    /// Keys passed to [`Driver::delete`], in call order.
    #[must_use]
    pub fn deletions(&self) -> Vec<(FixtureKind, CacheKey)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DriverCall::Delete(kind, key, _) => Some((*kind, key.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of [`Driver::process_batch`] calls.
    #[must_use]
    pub fn batch_flushes(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DriverCall::ProcessBatch))
            .count()
    }

    fn log(&self, call: DriverCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Driver for MemoryDriver {
    fn load(&self, kind: FixtureKind, key: &CacheKey) -> Result<Option<Record>, DriverError> {
        self.log(DriverCall::Load(kind, key.clone()));
        Ok(self.stored(kind, key))
    }

    fn delete(&self, kind: FixtureKind, key: &CacheKey, record: &Record) -> Result<(), DriverError> {
        self.log(DriverCall::Delete(kind, key.clone(), record.clone()));
        if self.rejected.borrow().contains(&(kind, key.clone())) {
            return Err(DriverError::Rejected {
                kind,
                key: key.clone(),
                reason: "deletion refused".to_owned(),
            });
        }
        match self.records.borrow_mut().remove(&(kind, key.clone())) {
            Some(_) => Ok(()),
            None => Err(DriverError::Missing {
                kind,
                key: key.clone(),
            }),
        }
    }

    fn alter(&self, kind: FixtureKind, key: &CacheKey, changes: &Record) -> Result<(), DriverError> {
        self.log(DriverCall::Alter(kind, key.clone(), changes.clone()));
        let mut records = self.records.borrow_mut();
        let Some(stored) = records.get_mut(&(kind, key.clone())) else {
            return Err(DriverError::Missing {
                kind,
                key: key.clone(),
            });
        };
        for (field, value) in changes {
            if *value == FieldValue::Null {
                stored.remove(field);
            } else {
                stored.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn process_batch(&self) -> Result<(), DriverError> {
        self.log(DriverCall::ProcessBatch);
        match self.batch_failure.borrow().as_ref() {
            Some(reason) => Err(DriverError::Backend(reason.clone())),
            None => Ok(()),
        }
    }

    fn run_cron(&self) -> Result<(), DriverError> {
        self.log(DriverCall::RunCron);
        Ok(())
    }

    fn clear_cache(&self) -> Result<(), DriverError> {
        self.log(DriverCall::ClearCache);
        Ok(())
    }
}
