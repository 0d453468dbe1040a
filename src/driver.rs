//! Boundary to the backing system that owns the real fixtures.
//!
//! The cache layer never creates or destroys fixtures itself. Reloads,
//! deletions and field updates go through a [`Driver`] supplied by the caller,
//! which keeps caches constructible in isolation and easy to stub in tests.

use crate::value::{CacheKey, Record};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kinds of fixture the typed caches track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureKind {
    /// User accounts.
    User,
    /// Content items.
    Node,
    /// Taxonomy terms.
    Term,
    /// User roles.
    Role,
    /// Enabled languages.
    Language,
}

impl FixtureKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::Node,
        Self::Term,
        Self::Role,
        Self::Language,
    ];

    /// Short name used in configuration and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Node => "node",
            Self::Term => "term",
            Self::Role => "role",
            Self::Language => "language",
        }
    }

    /// Entity type name understood by the backing system.
    #[must_use]
    pub const fn entity_type(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Node => "node",
            Self::Term => "taxonomy_term",
            Self::Role => "role",
            Self::Language => "language",
        }
    }

    /// Field of a created record that carries its primary key.
    #[must_use]
    pub const fn primary_key(self) -> &'static str {
        match self {
            Self::User => "uid",
            Self::Node => "nid",
            Self::Term => "tid",
            Self::Role => "rid",
            Self::Language => "langcode",
        }
    }

    /// Position in the teardown sequence. Lower ranks are cleaned first.
    ///
    /// Content goes before the accounts that author it and the terms that
    /// tag it; roles go after the users holding them; languages go last.
    #[must_use]
    pub const fn teardown_rank(self) -> u8 {
        match self {
            Self::Node => 2,
            Self::Term => 3,
            Self::User => 4,
            Self::Role => 5,
            Self::Language => 6,
        }
    }

    /// Whether the kind answers field lookups through its indices.
    #[must_use]
    pub const fn supports_find(self) -> bool {
        matches!(self, Self::User | Self::Node)
    }

    /// Whether deletions are queued and need a final
    /// [`Driver::process_batch`] call.
    #[must_use]
    pub const fn batches_deletes(self) -> bool {
        matches!(self, Self::User)
    }

    /// Fields that cannot be recovered from a reload and are retained by the
    /// cache at add time.
    #[must_use]
    pub const fn retained_fields(self) -> &'static [&'static str] {
        match self {
            Self::User => &["pass"],
            Self::Node | Self::Term | Self::Role | Self::Language => &[],
        }
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reported by a [`Driver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The backing system has no such fixture.
    #[error("{kind} '{key}' does not exist in the backing system")]
    Missing {
        /// Kind of fixture requested.
        kind: FixtureKind,
        /// Key that was requested.
        key: CacheKey,
    },
    /// The backing system refused the operation.
    #[error("{kind} '{key}' was rejected: {reason}")]
    Rejected {
        /// Kind of fixture involved.
        kind: FixtureKind,
        /// Key of the fixture involved.
        key: CacheKey,
        /// Reason given by the backing system.
        reason: String,
    },
    /// Any other backend failure.
    #[error("driver failure: {0}")]
    Backend(String),
}

/// Synchronous operations the cache layer needs from the backing system.
///
/// Every call is a blocking round-trip; the caches treat each one as atomic
/// and never retry.
pub trait Driver {
    /// Load the authoritative record for `key`, or `None` when it is gone.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the backend cannot answer.
    fn load(&self, kind: FixtureKind, key: &CacheKey) -> Result<Option<Record>, DriverError>;

    /// Delete the fixture described by `record`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the deletion fails.
    fn delete(&self, kind: FixtureKind, key: &CacheKey, record: &Record)
    -> Result<(), DriverError>;

    /// Apply `changes` to the fixture; a `null` value clears the field.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the update fails.
    fn alter(&self, kind: FixtureKind, key: &CacheKey, changes: &Record)
    -> Result<(), DriverError>;

    /// Flush any queued deletions.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the flush fails.
    fn process_batch(&self) -> Result<(), DriverError>;

    /// Run the backend's periodic maintenance tasks.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the run fails.
    fn run_cron(&self) -> Result<(), DriverError>;

    /// Clear the backend's own caches.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when clearing fails.
    fn clear_cache(&self) -> Result<(), DriverError>;
}
