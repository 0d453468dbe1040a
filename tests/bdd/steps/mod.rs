//! Step definition modules for BDD scenarios.
//!
//! Each module contains step definitions for one area of the cache layer.
//! Steps are registered via `#[given]`, `#[when]`, and `#[then]` attribute
//! macros.

#![expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd macros require Result returns for step functions"
)]

mod aliases;
mod lookups;
mod teardown;

use crate::bdd::fixtures::TestWorld;
use anyhow::Result;
use fixture_cache::alias::ALIAS_KEY;
use fixture_cache::driver::FixtureKind;
use fixture_cache::value::Record;

/// Create `record` in the backing system and track it in `cache`.
///
/// The alias marker and the plaintext password never reach the backing
/// system; the cache keeps them.
fn create_fixture(world: &TestWorld, cache: &str, kind: FixtureKind, record: Record) -> Result<()> {
    world.with_scenario(|scenario| {
        let mut stored = record.clone();
        stored.remove(ALIAS_KEY);
        stored.remove("pass");
        scenario.driver().create(kind, stored);
        scenario.track(cache, record)?;
        Ok(())
    })
}

/// Capture a failed operation for later assertions.
fn record_error(world: &TestWorld, err: &dyn std::error::Error) {
    world.last_error.set(err.to_string());
}
