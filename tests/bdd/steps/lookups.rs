//! Steps that create fixtures and read them back through the caches.

use super::{create_fixture, record_error};
use crate::bdd::fixtures::{RefCellOptionExt, TestWorld};
use anyhow::{Context, Result, ensure};
use fixture_cache::config::ScenarioConfig;
use fixture_cache::driver::{Driver, FixtureKind};
use fixture_cache::scenario::Scenario;
use fixture_cache::value::{CacheKey, Record, scalar_text};
use itertools::Itertools;
use rstest_bdd_macros::{given, then, when};
use serde_json::json;
use test_support::{MemoryDriver, record};

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a scenario with the standard cache layout")]
fn standard_layout(world: &TestWorld) -> Result<()> {
    let scenario = Scenario::from_config(MemoryDriver::new(), &ScenarioConfig::default())
        .context("build the standard layout")?;
    world.scenario.set_value(scenario);
    Ok(())
}

#[given("a user {name:string} with uid {uid:usize} exists")]
fn user_exists(world: &TestWorld, name: &str, uid: usize) -> Result<()> {
    create_fixture(
        world,
        "users",
        FixtureKind::User,
        record(json!({
            "uid": uid,
            "name": name,
            "mail": format!("{name}@example.com"),
            "pass": "secret",
        })),
    )
}

#[given("a user {name:string} with uid {uid:usize} and mail {mail:string} exists")]
fn user_with_mail_exists(world: &TestWorld, name: &str, uid: usize, mail: &str) -> Result<()> {
    create_fixture(
        world,
        "users",
        FixtureKind::User,
        record(json!({"uid": uid, "name": name, "mail": mail, "pass": "secret"})),
    )
}

#[given("a role {rid:string} exists")]
fn role_exists(world: &TestWorld, rid: &str) -> Result<()> {
    create_fixture(
        world,
        "roles",
        FixtureKind::Role,
        record(json!({"rid": rid, "name": rid})),
    )
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the backing system renames user {uid:usize} to {name:string}")]
fn rename_user(world: &TestWorld, uid: usize, name: &str) -> Result<()> {
    world.with_scenario(|scenario| {
        scenario
            .driver()
            .alter(FixtureKind::User, &CacheKey::from(uid), &record(json!({"name": name})))
            .context("rename in the backing system")
    })
}

#[when("the backing system forgets user {uid:usize}")]
fn forget_user(world: &TestWorld, uid: usize) -> Result<()> {
    world.with_scenario(|scenario| {
        scenario.driver().forget(FixtureKind::User, &CacheKey::from(uid));
        Ok(())
    })
}

#[when("the {cache:string} entry {key:string} is read")]
fn read_entry(world: &TestWorld, cache: &str, key: &str) -> Result<()> {
    let outcome = world.with_scenario(|scenario| Ok(scenario.get(cache, key)))?;
    if let Err(err) = outcome {
        record_error(world, &err);
    }
    Ok(())
}

#[when("the {cache:string} field {field:string} of {key:string} is cleared")]
fn clear_field(world: &TestWorld, cache: &str, field: &str, key: &str) -> Result<()> {
    world.with_scenario(|scenario| {
        let cx = scenario.context();
        scenario.cache(cache)?.delete_value(key, field, &cx)?;
        Ok(())
    })
}

#[when("the users cache is searched for name {name:string}")]
fn search_users(world: &TestWorld, name: &str) -> Result<()> {
    let mut criteria = Record::new();
    criteria.insert("name".to_owned(), json!(name));
    let keys = world.with_scenario(|scenario| {
        let cx = scenario.context();
        let found = scenario.cache("users")?.find(&criteria, &cx)?;
        Ok(found
            .iter()
            .filter_map(|value| value.field("uid").and_then(scalar_text))
            .collect::<Vec<_>>())
    })?;
    world.found_keys.set(keys);
    Ok(())
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the {cache:string} value {field:string} of {key:string} is {expected:string}")]
fn value_is(world: &TestWorld, cache: &str, field: &str, key: &str, expected: &str) -> Result<()> {
    let actual = world.with_scenario(|scenario| Ok(scenario.get_value(cache, key, field)?))?;
    ensure!(
        scalar_text(&actual).as_deref() == Some(expected),
        "expected {cache}[{key}].{field} to be '{expected}', got {actual}"
    );
    Ok(())
}

#[then("the backing user {uid:usize} has no {field:string}")]
fn backing_field_cleared(world: &TestWorld, uid: usize, field: &str) -> Result<()> {
    let stored = world.with_scenario(|scenario| {
        scenario
            .driver()
            .stored(FixtureKind::User, &CacheKey::from(uid))
            .context("user should still exist")
    })?;
    ensure!(!stored.contains_key(field), "field '{field}' should be cleared: {stored:?}");
    Ok(())
}

#[then("the found uids are {uids:string}")]
fn found_uids(world: &TestWorld, uids: &str) -> Result<()> {
    let found = world.found_keys.get().context("no search has run")?;
    let joined = found.iter().join(", ");
    ensure!(joined == uids, "expected uids '{uids}', got '{joined}'");
    Ok(())
}

#[then("the last error mentions {fragment:string}")]
fn last_error_mentions(world: &TestWorld, fragment: &str) -> Result<()> {
    let message = world.last_error.get().context("no error was captured")?;
    ensure!(
        message.contains(fragment),
        "expected error to mention '{fragment}', got '{message}'"
    );
    Ok(())
}
