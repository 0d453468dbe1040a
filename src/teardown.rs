//! End-of-scenario teardown across every registered cache.
//!
//! Caches are cleaned in [`CacheRegistry::cleanup_order`]: aliases first,
//! then content, then the accounts, terms, roles and languages it depends on.
//! A failing cache never stops the pass; its error is collected and the next
//! cache is cleaned.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use crate::driver::Driver;
use crate::error::CacheError;
use crate::registry::CacheRegistry;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, warn};

/// Every cache failure from one teardown pass.
#[derive(Debug, Error, Diagnostic)]
#[error("teardown finished with failures in {} cache(s)", .failures.len())]
#[diagnostic(
    code(fixture_cache::teardown::failed),
    help("every cache was emptied; fixtures listed below may still exist in the backing system")
)]
pub struct TeardownError {
    /// Failures in teardown order.
    #[related]
    pub failures: Vec<CacheError>,
}

/// Outcome of one teardown pass.
#[derive(Debug, Default)]
pub struct TeardownReport {
    cleaned: Vec<String>,
    failures: Vec<CacheError>,
}

impl TeardownReport {
    /// Caches that were cleaned without error, in teardown order.
    #[must_use]
    pub fn cleaned(&self) -> &[String] {
        &self.cleaned
    }

    /// Cache failures, in teardown order.
    #[must_use]
    pub fn failures(&self) -> &[CacheError] {
        &self.failures
    }

    /// Returns `true` when no cache reported a failure.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert into a result.
    ///
    /// # Errors
    ///
    /// Returns [`TeardownError`] when any cache failed.
    pub fn into_result(self) -> Result<(), TeardownError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(TeardownError {
                failures: self.failures,
            })
        }
    }
}

/// Runs teardown across a [`CacheRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOrchestrator;

impl CleanupOrchestrator {
    /// Clean every registered cache in teardown order.
    pub fn run(registry: &mut CacheRegistry, driver: &dyn Driver) -> TeardownReport {
        let mut report = TeardownReport::default();
        for name in registry.cleanup_order() {
            let outcome = registry
                .get_mut(&name)
                .and_then(|cache| cache.clean(driver));
            match outcome {
                Ok(()) => report.cleaned.push(name),
                Err(err) => {
                    warn!(cache = %name, error = %err, "cache teardown failed");
                    report.failures.push(err);
                }
            }
        }
        info!(
            cleaned = report.cleaned.len(),
            failed = report.failures.len(),
            "scenario teardown finished"
        );
        report
    }
}
