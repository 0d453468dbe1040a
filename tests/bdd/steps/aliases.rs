//! Steps for `@` aliases and `@:name` references.

use super::{create_fixture, record_error};
use crate::bdd::fixtures::TestWorld;
use anyhow::{Context, Result, ensure};
use fixture_cache::driver::FixtureKind;
use rstest_bdd_macros::{given, then, when};
use serde_json::json;
use test_support::record;

#[given("a user {name:string} with uid {uid:usize} aliased as {alias:string}")]
fn aliased_user(world: &TestWorld, name: &str, uid: usize, alias: &str) -> Result<()> {
    create_fixture(
        world,
        "users",
        FixtureKind::User,
        record(json!({"uid": uid, "name": name, "pass": "secret", "@": alias})),
    )
}

#[given("a node {title:string} with nid {nid:usize} aliased as {alias:string}")]
fn aliased_node(world: &TestWorld, title: &str, nid: usize, alias: &str) -> Result<()> {
    create_fixture(
        world,
        "nodes",
        FixtureKind::Node,
        record(json!({"nid": nid, "title": title, "type": "page", "@": alias})),
    )
}

#[given("a node {title:string} with nid {nid:usize} exists")]
fn node_exists(world: &TestWorld, title: &str, nid: usize) -> Result<()> {
    create_fixture(
        world,
        "nodes",
        FixtureKind::Node,
        record(json!({"nid": nid, "title": title, "type": "page"})),
    )
}

#[when("the reference {reference:string} is resolved")]
fn resolve(world: &TestWorld, reference: &str) -> Result<()> {
    let outcome = world.with_scenario(|scenario| Ok(scenario.resolve_reference(reference)))?;
    match outcome {
        Ok(key) => world.resolved.set(key),
        Err(err) => record_error(world, &err),
    }
    Ok(())
}

#[when("the alias {alias:string} is removed")]
fn remove_alias(world: &TestWorld, alias: &str) -> Result<()> {
    world.with_scenario(|scenario| {
        scenario.cache_mut("aliases")?.remove(alias)?;
        Ok(())
    })
}

#[then("the reference resolves to {key:string}")]
fn resolves_to(world: &TestWorld, key: &str) -> Result<()> {
    let resolved = world.resolved.get().context("no reference was resolved")?;
    ensure!(resolved == key, "expected '{key}', got '{resolved}'");
    Ok(())
}

#[then("the {cache:string} cache holds {count:usize} entries")]
fn cache_holds(world: &TestWorld, cache: &str, count: usize) -> Result<()> {
    let actual = world.with_scenario(|scenario| Ok(scenario.cache(cache)?.count()))?;
    ensure!(actual == count, "expected {count} entries in '{cache}', got {actual}");
    Ok(())
}
