//! Alias markers in step data.
//!
//! A record created by a step may carry an `@` field naming it for later
//! steps, and a later step refers back to it with an `@:name` value.
//!
//! ```
//! use fixture_cache::alias::{alias_reference, extract_alias_key};
//! use serde_json::json;
//!
//! let mut record = json!({"name": "alice", "@": "author"})
//!     .as_object()
//!     .cloned()
//!     .unwrap_or_default();
//! assert_eq!(extract_alias_key(&mut record).as_deref(), Some("author"));
//! assert!(!record.contains_key("@"));
//! assert_eq!(alias_reference("@:author"), Some("author"));
//! assert_eq!(alias_reference("author"), None);
//! ```

use crate::value::{Record, scalar_text};

/// Record field carrying the alias of a newly created fixture.
pub const ALIAS_KEY: &str = "@";

/// Prefix of a value that refers to an alias.
pub const ALIAS_VALUE_PREFIX: &str = "@:";

/// Remove the alias field from `record` and return its text.
///
/// Non-scalar and empty aliases are removed and ignored.
pub fn extract_alias_key(record: &mut Record) -> Option<String> {
    let alias = record.remove(ALIAS_KEY)?;
    scalar_text(&alias).filter(|text| !text.is_empty())
}

/// Alias named by an `@:name` reference, or `None` for any other value.
#[must_use]
pub fn alias_reference(value: &str) -> Option<&str> {
    value
        .strip_prefix(ALIAS_VALUE_PREFIX)
        .filter(|name| !name.is_empty())
}
