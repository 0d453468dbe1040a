//! Fixture cache core library.
//!
//! This library tracks the fixtures a BDD scenario creates so later steps can
//! look them up by key, by indexed field or by alias, and so every fixture is
//! torn down in dependency order when the scenario ends.

pub mod alias;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
pub mod scenario;
pub mod teardown;
pub mod value;
