//! Steps for scenario teardown.

use crate::bdd::fixtures::TestWorld;
use anyhow::{Context, Result, ensure};
use fixture_cache::cache::NOCLEAN;
use fixture_cache::driver::FixtureKind;
use fixture_cache::value::CacheKey;
use itertools::Itertools;
use rstest_bdd_macros::{given, then, when};

#[given("the {cache:string} entry {key:string} is flagged noclean")]
fn flag_noclean(world: &TestWorld, cache: &str, key: &str) -> Result<()> {
    world.with_scenario(|scenario| {
        scenario
            .cache_mut(cache)?
            .add_cache_instruction(key, NOCLEAN, true)?;
        Ok(())
    })
}

#[given("the backing system refuses to delete node {nid:usize}")]
fn refuse_node_deletion(world: &TestWorld, nid: usize) -> Result<()> {
    world.with_scenario(|scenario| {
        scenario
            .driver()
            .reject_delete(FixtureKind::Node, CacheKey::from(nid));
        Ok(())
    })
}

#[when("the scenario is torn down")]
fn tear_down(world: &TestWorld) -> Result<()> {
    let report = world.with_scenario(|scenario| Ok(scenario.teardown()))?;
    world.cleaned.set(report.cleaned().to_vec());
    world.teardown_failures.set(report.failures().len());
    Ok(())
}

#[then("the deletion order is {order:string}")]
fn deletion_order(world: &TestWorld, order: &str) -> Result<()> {
    let deletions = world.with_scenario(|scenario| Ok(scenario.driver().deletions()))?;
    let actual = deletions
        .iter()
        .map(|(kind, key)| format!("{kind}:{}", key.as_str()))
        .join(", ");
    ensure!(actual == order, "expected deletions '{order}', got '{actual}'");
    Ok(())
}

#[then("the number of batch flushes is {count:usize}")]
fn batch_flushes(world: &TestWorld, count: usize) -> Result<()> {
    let actual = world.with_scenario(|scenario| Ok(scenario.driver().batch_flushes()))?;
    ensure!(actual == count, "expected {count} batch flushes, got {actual}");
    Ok(())
}

#[then("every cache is empty")]
fn every_cache_empty(world: &TestWorld) -> Result<()> {
    let leftovers = world.with_scenario(|scenario| {
        Ok(scenario
            .registry()
            .iter()
            .filter(|cache| cache.count() > 0)
            .map(|cache| cache.name().to_owned())
            .collect::<Vec<_>>())
    })?;
    ensure!(leftovers.is_empty(), "caches still hold entries: {leftovers:?}");
    Ok(())
}

#[then("the role {rid:string} still exists in the backing system")]
fn role_survives(world: &TestWorld, rid: &str) -> Result<()> {
    let exists = world.with_scenario(|scenario| {
        Ok(scenario.driver().exists(FixtureKind::Role, &CacheKey::from(rid)))
    })?;
    ensure!(exists, "role '{rid}' should not have been deleted");
    Ok(())
}

#[then("user {uid:usize} no longer exists in the backing system")]
fn user_gone(world: &TestWorld, uid: usize) -> Result<()> {
    let exists = world.with_scenario(|scenario| {
        Ok(scenario.driver().exists(FixtureKind::User, &CacheKey::from(uid)))
    })?;
    ensure!(!exists, "user {uid} should have been deleted");
    Ok(())
}

#[then("the number of failed caches is {count:usize}")]
fn failed_caches(world: &TestWorld, count: usize) -> Result<()> {
    let failures = world.teardown_failures.get().context("no teardown has run")?;
    ensure!(failures == count, "expected {count} failed caches, got {failures}");
    Ok(())
}

#[then("the cleaned caches are {names:string}")]
fn cleaned_caches(world: &TestWorld, names: &str) -> Result<()> {
    let cleaned = world.cleaned.get().context("no teardown has run")?;
    let joined = cleaned.iter().join(", ");
    ensure!(joined == names, "expected cleaned caches '{names}', got '{joined}'");
    Ok(())
}
