//! Keys and values stored by fixture caches.
//!
//! Keys are scalar identifiers normalised to their string form so integer and
//! string identifiers address the same entry. Values are either the key stored
//! as its own scalar, a structured [`Record`], or an [`AliasRecord`] pointing
//! into another cache.
//!
//! # Examples
//!
//! ```
//! use fixture_cache::value::{CacheKey, scalar_text};
//! use serde_json::json;
//!
//! assert_eq!(CacheKey::from(42_u64), CacheKey::from("42"));
//! assert_eq!(scalar_text(&json!(true)).as_deref(), Some("true"));
//! assert!(CacheKey::from_scalar(&json!(["a"])).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Field value carried by a record.
pub type FieldValue = serde_json::Value;
/// Ordered mapping from field name to value.
pub type Record = serde_json::Map<String, FieldValue>;

/// Primary key of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build a key from a JSON scalar. Returns `None` for `null`, arrays and
    /// objects.
    #[must_use]
    pub fn from_scalar(value: &FieldValue) -> Option<Self> {
        scalar_text(value).map(Self)
    }

    /// Borrow the normalised string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the key has no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(key: &CacheKey) -> Self {
        key.clone()
    }
}

macro_rules! key_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CacheKey {
                fn from(key: $ty) -> Self {
                    Self(key.to_string())
                }
            }
        )*
    };
}

key_from_integer!(u32, u64, usize, i32, i64);

/// String form of a scalar field value, or `None` for `null`, arrays and
/// objects.
#[must_use]
pub fn scalar_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::String(text) => Some(text.clone()),
        FieldValue::Number(number) => Some(number.to_string()),
        FieldValue::Bool(flag) => Some(flag.to_string()),
        FieldValue::Null | FieldValue::Array(_) | FieldValue::Object(_) => None,
    }
}

/// Pointer from a referential cache into a sibling cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    /// Name of the sibling cache holding the fixture.
    pub cache_name: String,
    /// Primary key of the fixture within that cache.
    pub target_key: CacheKey,
}

impl AliasRecord {
    /// Create a pointer to `target_key` inside `cache_name`.
    #[must_use]
    pub fn new(cache_name: impl Into<String>, target_key: impl Into<CacheKey>) -> Self {
        Self {
            cache_name: cache_name.into(),
            target_key: target_key.into(),
        }
    }
}

/// Value held by a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// The key stored as its own value.
    Scalar(String),
    /// A structured fixture record.
    Record(Record),
    /// A pointer into a sibling cache.
    Alias(AliasRecord),
}

impl CachedValue {
    /// Borrow the record when the value is structured.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Scalar(_) | Self::Alias(_) => None,
        }
    }

    /// Borrow the alias pointer when the value is one.
    #[must_use]
    pub const fn as_alias(&self) -> Option<&AliasRecord> {
        match self {
            Self::Alias(alias) => Some(alias),
            Self::Scalar(_) | Self::Record(_) => None,
        }
    }

    /// Look up a field of a structured value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.as_record().and_then(|record| record.get(name))
    }
}

impl From<Record> for CachedValue {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}
