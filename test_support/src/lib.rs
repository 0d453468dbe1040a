//! Test utilities for the fixture cache.
//!
//! This crate provides an in-memory [`Driver`] that records every call, plus
//! helpers for writing configuration files and formatting error chains.

pub mod error;
pub mod memory_driver;

pub use error::{display_error_chain, teardown_failures};
pub use memory_driver::{DriverCall, MemoryDriver};

use fixture_cache::value::Record;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Build a [`Record`] from a JSON object literal.
///
/// # Panics
///
/// Panics when `value` is not a JSON object.
#[must_use]
pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Write `yaml` to a cache layout file inside a fresh temporary directory.
///
/// Returns the directory, which must be kept alive, and the file path.
pub fn layout_file(yaml: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("caches.yml");
    fs::write(&path, yaml).expect("write layout");
    (dir, path)
}
