//! Shared state for BDD scenarios.
//!
//! Each scenario receives a fresh [`TestWorld`]. The fixture cache scenario
//! is not `Clone`, so it lives in a `RefCell<Option<T>>`; captured results
//! use `Slot<T>`. Dropping the world drops the scenario, which tears down
//! whatever the steps left behind.

// The `#[fixture]` macro generates types that cannot have doc comments attached
#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use anyhow::{Context, Result};
use fixture_cache::scenario::Scenario;
use rstest::fixture;
use rstest_bdd::Slot;
use std::cell::RefCell;
use test_support::MemoryDriver;

/// Scenario type driven by the BDD steps.
pub type TestScenario = Scenario<MemoryDriver>;

/// Combined test world for all BDD scenarios.
#[derive(Default)]
pub struct TestWorld {
    /// Caches and in-memory backing system of the running scenario.
    pub scenario: RefCell<Option<TestScenario>>,
    /// Message of the last failed cache operation.
    pub last_error: Slot<String>,
    /// Primary keys returned by the last `find`.
    pub found_keys: Slot<Vec<String>>,
    /// Key produced by the last resolved alias reference.
    pub resolved: Slot<String>,
    /// Caches cleaned by the last teardown.
    pub cleaned: Slot<Vec<String>>,
    /// Number of caches that failed during the last teardown.
    pub teardown_failures: Slot<usize>,
}

impl TestWorld {
    /// Run `f` against the active scenario.
    ///
    /// # Errors
    ///
    /// Fails when no scenario has been started, or when `f` fails.
    pub fn with_scenario<R>(&self, f: impl FnOnce(&mut TestScenario) -> Result<R>) -> Result<R> {
        self.scenario
            .with_mut(f)
            .context("no fixture scenario has been started")?
    }
}

/// Fixture providing a fresh `TestWorld` for each scenario.
#[fixture]
pub fn world() -> TestWorld {
    TestWorld::default()
}

/// Helper trait extensions for `RefCell<Option<T>>`.
pub trait RefCellOptionExt<T> {
    /// Set the value inside the `RefCell`.
    fn set_value(&self, value: T);
    /// Returns `true` if the `RefCell` contains `Some`.
    fn is_some(&self) -> bool;
    /// Borrow the inner value mutably and apply a function.
    fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>;
}

impl<T> RefCellOptionExt<T> for RefCell<Option<T>> {
    fn set_value(&self, value: T) {
        *self.borrow_mut() = Some(value);
    }

    fn is_some(&self) -> bool {
        self.borrow().is_some()
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.borrow_mut().as_mut().map(f)
    }
}
