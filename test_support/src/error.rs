//! Error formatting helpers for cache assertions.

use fixture_cache::teardown::TeardownError;
use std::error::Error;

/// Render a cache error with its sources, outermost first, joined by `": "`.
///
/// Driver failures wrapped in [`fixture_cache::error::CacheError::Driver`]
/// appear after the cache message, so assertions can match either layer.
///
/// ```
/// use fixture_cache::driver::DriverError;
/// use fixture_cache::error::{CacheError, CacheOp};
///
/// let err = CacheError::Driver {
///     cache: "users".into(),
///     op: CacheOp::Get,
///     key: "7".into(),
///     source: DriverError::Backend("offline".into()),
/// };
/// let text = test_support::display_error_chain(&err);
/// assert!(text.ends_with(": driver failure: offline"), "{text}");
/// ```
pub fn display_error_chain(err: &(dyn Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// One rendered chain per cache that failed during teardown.
#[must_use]
pub fn teardown_failures(err: &TeardownError) -> Vec<String> {
    err.failures
        .iter()
        .map(|failure| display_error_chain(failure))
        .collect()
}
