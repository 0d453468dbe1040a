//! Declarative cache layout for a scenario.
//!
//! A [`ScenarioConfig`] lists the caches every scenario starts with. It is
//! usually loaded from YAML:
//!
//! ```yaml
//! alias_cache: aliases
//! caches:
//!   - name: users
//!     kind: user
//!     indices: [name, mail]
//!   - name: aliases
//!     kind: referential
//!     siblings: [users]
//! ```
//!
//! Each scenario calls [`ScenarioConfig::build_registry`] to get a fresh set
//! of empty caches.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

mod diagnostics;

use crate::cache::{CoreCache, EntityCache, FixtureCache, ReferentialCache};
use crate::driver::FixtureKind;
use crate::error::CacheError;
use crate::registry::CacheRegistry;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Failures loading or applying a [`ScenarioConfig`].
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read cache configuration '{path}'")]
    #[diagnostic(code(fixture_cache::config::read))]
    Read {
        /// File that was read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The YAML was malformed or did not match the expected shape.
    #[error("cache configuration parse error")]
    #[diagnostic(code(fixture_cache::config::parse))]
    Parse {
        /// Annotated parse failure.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },
    /// A referential cache declared indices.
    #[error("cache '{cache}' is referential and cannot declare indices")]
    #[diagnostic(
        code(fixture_cache::config::referential_indices),
        help("declare the indices on the sibling caches instead")
    )]
    IndicesOnReferential {
        /// Offending cache.
        cache: String,
    },
    /// A non-referential cache declared siblings.
    #[error("cache '{cache}' is not referential and cannot declare siblings")]
    #[diagnostic(code(fixture_cache::config::unexpected_siblings))]
    UnexpectedSiblings {
        /// Offending cache.
        cache: String,
    },
    /// A referential cache lists another referential cache as a sibling.
    #[error("cache '{cache}' cannot point into referential cache '{sibling}'")]
    #[diagnostic(
        code(fixture_cache::config::referential_sibling),
        help("aliases must point at fixture caches, not at other aliases")
    )]
    ReferentialSibling {
        /// Offending cache.
        cache: String,
        /// Sibling that is itself referential.
        sibling: String,
    },
    /// `alias_cache` does not name a configured referential cache.
    #[error("alias cache '{name}' is not a configured referential cache")]
    #[diagnostic(code(fixture_cache::config::alias_cache))]
    InvalidAliasCache {
        /// Configured alias cache name.
        name: String,
    },
    /// Building a cache failed.
    #[error("failed to build cache '{cache}'")]
    #[diagnostic(code(fixture_cache::config::build))]
    Build {
        /// Cache being built.
        cache: String,
        /// Underlying cache failure.
        #[source]
        #[diagnostic_source]
        source: CacheError,
    },
}

/// Kind of cache to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKindConfig {
    /// A [`CoreCache`].
    Core,
    /// An [`EntityCache`] of users.
    User,
    /// An [`EntityCache`] of content.
    Node,
    /// An [`EntityCache`] of taxonomy terms.
    Term,
    /// An [`EntityCache`] of roles.
    Role,
    /// An [`EntityCache`] of languages.
    Language,
    /// A [`ReferentialCache`].
    Referential,
}

impl CacheKindConfig {
    /// Fixture kind backing this cache, if it is an entity cache.
    #[must_use]
    pub const fn fixture_kind(self) -> Option<FixtureKind> {
        match self {
            Self::User => Some(FixtureKind::User),
            Self::Node => Some(FixtureKind::Node),
            Self::Term => Some(FixtureKind::Term),
            Self::Role => Some(FixtureKind::Role),
            Self::Language => Some(FixtureKind::Language),
            Self::Core | Self::Referential => None,
        }
    }
}

/// One cache of the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Registry name.
    pub name: String,
    /// What to construct.
    pub kind: CacheKindConfig,
    /// Indices to declare, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<String>,
    /// Caches a referential cache may point into.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<String>,
}

impl CacheConfig {
    fn new(name: &str, kind: CacheKindConfig, indices: &[&str], siblings: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            indices: indices.iter().map(|s| (*s).to_owned()).collect(),
            siblings: siblings.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    fn build(&self) -> Result<Box<dyn FixtureCache>, ConfigError> {
        if self.kind == CacheKindConfig::Referential {
            if !self.indices.is_empty() {
                return Err(ConfigError::IndicesOnReferential {
                    cache: self.name.clone(),
                });
            }
            return Ok(Box::new(ReferentialCache::new(
                self.name.clone(),
                self.siblings.iter().cloned(),
            )));
        }
        if !self.siblings.is_empty() {
            return Err(ConfigError::UnexpectedSiblings {
                cache: self.name.clone(),
            });
        }
        let mut cache: Box<dyn FixtureCache> = match self.kind.fixture_kind() {
            Some(kind) => Box::new(EntityCache::new(self.name.clone(), kind)),
            None => Box::new(CoreCache::new(self.name.clone())),
        };
        if !self.indices.is_empty() {
            let names: Vec<&str> = self.indices.iter().map(String::as_str).collect();
            cache
                .add_indices(&names)
                .map_err(|source| ConfigError::Build {
                    cache: self.name.clone(),
                    source,
                })?;
        }
        Ok(cache)
    }
}

/// Cache layout shared by every scenario of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Referential cache that receives `@` aliases of tracked fixtures.
    #[serde(default)]
    pub alias_cache: Option<String>,
    /// Caches to construct, in registration order.
    #[serde(default)]
    pub caches: Vec<CacheConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        use CacheKindConfig::{Language, Node, Referential, Role, Term, User};
        Self {
            alias_cache: Some("aliases".to_owned()),
            caches: vec![
                CacheConfig::new("users", User, &["name", "mail"], &[]),
                CacheConfig::new("nodes", Node, &["title", "type"], &[]),
                CacheConfig::new("terms", Term, &["name", "vocabulary_machine_name"], &[]),
                CacheConfig::new("roles", Role, &["name"], &[]),
                CacheConfig::new("languages", Language, &["langcode"], &[]),
                CacheConfig::new(
                    "aliases",
                    Referential,
                    &[],
                    &["users", "nodes", "terms", "roles", "languages"],
                ),
            ],
        }
    }
}

impl ScenarioConfig {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the YAML is malformed or does not
    /// describe a cache layout.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_named(yaml, "cache configuration")
    }

    fn from_yaml_named(yaml: &str, name: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|err| ConfigError::Parse {
            source: diagnostics::yaml_diagnostic(err, yaml, name),
        })
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents are invalid.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        tracing::debug!(%path, "loaded cache configuration");
        Self::from_yaml_named(&yaml, path.as_str())
    }

    /// Construct a fresh registry holding every configured cache.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a cache entry is inconsistent, two
    /// caches share a name, a referential cache points into another
    /// referential cache, or `alias_cache` is not a referential cache.
    pub fn build_registry(&self) -> Result<CacheRegistry, ConfigError> {
        if let Some(alias_cache) = &self.alias_cache {
            let is_referential = self.caches.iter().any(|cache| {
                cache.name == *alias_cache && cache.kind == CacheKindConfig::Referential
            });
            if !is_referential {
                return Err(ConfigError::InvalidAliasCache {
                    name: alias_cache.clone(),
                });
            }
        }
        let referential: BTreeSet<&str> = self
            .caches
            .iter()
            .filter(|cache| cache.kind == CacheKindConfig::Referential)
            .map(|cache| cache.name.as_str())
            .collect();
        for cache in &self.caches {
            if let Some(sibling) = cache
                .siblings
                .iter()
                .find(|sibling| referential.contains(sibling.as_str()))
            {
                return Err(ConfigError::ReferentialSibling {
                    cache: cache.name.clone(),
                    sibling: sibling.clone(),
                });
            }
        }
        let mut registry = CacheRegistry::default();
        for cache in &self.caches {
            registry
                .register(cache.build()?)
                .map_err(|source| ConfigError::Build {
                    cache: cache.name.clone(),
                    source,
                })?;
        }
        Ok(registry)
    }

    /// `(cache, sibling)` pairs whose sibling no configured cache provides.
    ///
    /// Resolution is lazy, so these are reported rather than rejected.
    #[must_use]
    pub fn dangling_siblings(&self) -> Vec<(String, String)> {
        let names: BTreeSet<&str> = self.caches.iter().map(|c| c.name.as_str()).collect();
        self.caches
            .iter()
            .flat_map(|cache| {
                cache
                    .siblings
                    .iter()
                    .filter(|sibling| !names.contains(sibling.as_str()))
                    .map(|sibling| (cache.name.clone(), sibling.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
