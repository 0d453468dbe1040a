//! Error types for the cache layer.
//!
//! Every message names the cache, the operation and the offending key, field
//! or index so a failing scenario points straight at the step that broke.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use crate::driver::DriverError;
use crate::value::CacheKey;
use itertools::Itertools;
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Cache operations named in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// `add`
    Add,
    /// `add_indices`
    AddIndices,
    /// `get`
    Get,
    /// `get_value`
    GetValue,
    /// `delete_value`
    DeleteValue,
    /// `get_index`
    GetIndex,
    /// `remove`
    Remove,
    /// `find`
    Find,
    /// `add_cache_instruction`
    AddInstruction,
}

impl CacheOp {
    /// Operation name as it appears in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddIndices => "add_indices",
            Self::Get => "get",
            Self::GetValue => "get_value",
            Self::DeleteValue => "delete_value",
            Self::GetIndex => "get_index",
            Self::Remove => "remove",
            Self::Find => "find",
            Self::AddInstruction => "add_cache_instruction",
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a failed teardown call was acting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupTarget {
    /// Deletion of a single fixture.
    Fixture(CacheKey),
    /// The final flush of queued deletions.
    Batch,
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixture(key) => write!(f, "'{key}'"),
            Self::Batch => f.write_str("batch flush"),
        }
    }
}

/// A teardown call that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Fixture or flush that failed.
    pub target: CleanupTarget,
    /// Driver failure reported for it.
    pub error: DriverError,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

/// Teardown calls that failed during a single `clean`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupFailures(pub Vec<CleanupFailure>);

impl CleanupFailures {
    /// Returns `true` when no call failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failed calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Record a failed call.
    pub fn push(&mut self, target: CleanupTarget, error: DriverError) {
        self.0.push(CleanupFailure { target, error });
    }

    /// Iterate over the failures in teardown order.
    pub fn iter(&self) -> std::slice::Iter<'_, CleanupFailure> {
        self.0.iter()
    }
}

impl fmt::Display for CleanupFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} teardown call(s) failed: {}",
            self.len(),
            self.iter().join("; ")
        )
    }
}

/// Errors raised by cache operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    /// The key was empty or not a scalar.
    #[error("{cache}::{op}: invalid key '{key}': {reason}")]
    #[diagnostic(code(fixture_cache::cache::invalid_key))]
    InvalidKey {
        /// Cache that rejected the key.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Rendering of the rejected key.
        key: String,
        /// Why the key was rejected.
        reason: &'static str,
    },
    /// The key is already live in the cache.
    #[error("{cache}::add: an entry with key '{key}' already exists")]
    #[diagnostic(
        code(fixture_cache::cache::duplicate_key),
        help("remove the existing entry before adding it again")
    )]
    DuplicateKey {
        /// Cache holding the key.
        cache: String,
        /// The duplicated key.
        key: CacheKey,
    },
    /// No entry exists for the key.
    #[error("{cache}::{op}: no entry found for key '{key}'")]
    #[diagnostic(code(fixture_cache::cache::not_found))]
    NotFound {
        /// Cache that was searched.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Requested key.
        key: String,
    },
    /// The entry's value has no such field.
    #[error("{cache}::{op}: the value for key '{key}' has no field '{field}'")]
    #[diagnostic(code(fixture_cache::cache::field_not_found))]
    FieldNotFound {
        /// Cache holding the entry.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Key of the entry.
        key: String,
        /// Requested field.
        field: String,
    },
    /// `add_indices` was called without any index names.
    #[error("{cache}::add_indices: at least one index name is required")]
    #[diagnostic(code(fixture_cache::cache::empty_index_list))]
    EmptyIndexList {
        /// Cache the call was made on.
        cache: String,
    },
    /// The index was never declared on this cache.
    #[error("{cache}::{op}: the index '{index}' does not exist in this cache")]
    #[diagnostic(code(fixture_cache::cache::unknown_index))]
    UnknownIndex {
        /// Cache that was queried.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Requested index name.
        index: String,
    },
    /// A find criterion names a field that is not indexed.
    #[error("{cache}::find: the field '{field}' is not a declared index")]
    #[diagnostic(
        code(fixture_cache::cache::index_not_declared),
        help("declare the field with add_indices before searching on it")
    )]
    IndexNotDeclared {
        /// Cache that was searched.
        cache: String,
        /// Field used as a criterion.
        field: String,
    },
    /// An alias targets a cache outside the referential cache's sibling set.
    #[error("{cache}::{op}: the cache '{sibling}' referenced by '{key}' is not referrable")]
    #[diagnostic(code(fixture_cache::cache::unknown_sibling_cache))]
    UnknownSiblingCache {
        /// Referential cache involved.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Alias key.
        key: String,
        /// Name of the missing sibling.
        sibling: String,
    },
    /// An alias value lacks its cache name or target key.
    #[error("{cache}::add: alias '{key}' is invalid: {reason}")]
    #[diagnostic(
        code(fixture_cache::cache::invalid_alias),
        help("aliases need a 'cache' name and a scalar 'value' key")
    )]
    InvalidAlias {
        /// Referential cache involved.
        cache: String,
        /// Alias key.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },
    /// The operation is deliberately not implemented by this cache.
    #[error("{cache}::{op}: operation not supported by this cache")]
    #[diagnostic(code(fixture_cache::cache::unsupported))]
    Unsupported {
        /// Cache the call was made on.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
    },
    /// The entry is cached but its backing record no longer exists.
    #[error("{cache}::{op}: key '{key}' is cached but its record no longer exists")]
    #[diagnostic(code(fixture_cache::cache::stale))]
    Stale {
        /// Cache holding the entry.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Key of the entry.
        key: CacheKey,
    },
    /// A driver call failed.
    #[error("{cache}::{op}: driver call failed for key '{key}'")]
    #[diagnostic(code(fixture_cache::cache::driver))]
    Driver {
        /// Cache making the call.
        cache: String,
        /// Operation that was attempted.
        op: CacheOp,
        /// Key of the entry.
        key: CacheKey,
        /// Underlying driver failure.
        #[source]
        source: DriverError,
    },
    /// Some teardown calls failed; the cache was emptied anyway.
    #[error("{cache}::clean: {failures}")]
    #[diagnostic(code(fixture_cache::cache::cleanup))]
    Cleanup {
        /// Cache that was cleaned.
        cache: String,
        /// Per-fixture failures, in teardown order.
        failures: CleanupFailures,
    },
    /// An alias was used but the scenario has no alias cache.
    #[error("no alias cache is configured; cannot resolve alias '{alias}'")]
    #[diagnostic(
        code(fixture_cache::registry::no_alias_cache),
        help("set alias_cache to a referential cache in the configuration")
    )]
    NoAliasCache {
        /// Alias that was being stored or resolved.
        alias: String,
    },
    /// No cache with this name is registered.
    #[error("no cache named '{name}' is registered for this scenario")]
    #[diagnostic(code(fixture_cache::registry::unknown_cache))]
    UnknownCache {
        /// Requested cache name.
        name: String,
    },
    /// A cache with this name is already registered.
    #[error("a cache named '{name}' is already registered for this scenario")]
    #[diagnostic(code(fixture_cache::registry::duplicate_cache))]
    DuplicateCache {
        /// Duplicated cache name.
        name: String,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
