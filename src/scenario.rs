//! Per-scenario cache context.
//!
//! A [`Scenario`] owns the [`Driver`] and the [`CacheRegistry`] of one test
//! scenario. Steps track the fixtures they create through it, look them up
//! through [`Scenario::context`], and refer back to aliased fixtures with
//! `@:name` values. Teardown runs through [`Scenario::teardown`], or on drop
//! when fixtures are still cached.

use crate::alias::{alias_reference, extract_alias_key};
use crate::cache::{ALIAS_CACHE_FIELD, ALIAS_VALUE_FIELD, CacheContext, FixtureCache};
use crate::config::{ConfigError, ScenarioConfig};
use crate::driver::{Driver, DriverError};
use crate::error::{CacheError, CacheOp, CacheResult};
use crate::registry::CacheRegistry;
use crate::teardown::{CleanupOrchestrator, TeardownReport};
use crate::value::{CacheKey, CachedValue, FieldValue, Record};

/// Caches and driver of one running scenario.
pub struct Scenario<D: Driver> {
    driver: D,
    registry: CacheRegistry,
    alias_cache: Option<String>,
}

impl<D: Driver> Scenario<D> {
    /// Wrap an existing registry.
    #[must_use]
    pub fn new(driver: D, registry: CacheRegistry, alias_cache: Option<String>) -> Self {
        Self {
            driver,
            registry,
            alias_cache,
        }
    }

    /// Build fresh caches from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the layout cannot be built.
    pub fn from_config(driver: D, config: &ScenarioConfig) -> Result<Self, ConfigError> {
        let registry = config.build_registry()?;
        Ok(Self::new(driver, registry, config.alias_cache.clone()))
    }

    /// Driver of this scenario.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Caches of this scenario.
    #[must_use]
    pub const fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    /// Mutable caches of this scenario.
    pub const fn registry_mut(&mut self) -> &mut CacheRegistry {
        &mut self.registry
    }

    /// Lookup context over this scenario's driver and caches.
    #[must_use]
    pub fn context(&self) -> CacheContext<'_> {
        CacheContext::new(&self.driver, &self.registry)
    }

    /// Borrow cache `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownCache`] when it is not registered.
    pub fn cache(&self, name: &str) -> CacheResult<&dyn FixtureCache> {
        self.registry.get(name)
    }

    /// Mutably borrow cache `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownCache`] when it is not registered.
    pub fn cache_mut(&mut self, name: &str) -> CacheResult<&mut dyn FixtureCache> {
        self.registry.get_mut(name)
    }

    /// Current value of `key` in cache `name`.
    ///
    /// # Errors
    ///
    /// Propagates the lookup failure of the cache.
    pub fn get(&self, name: &str, key: &str) -> CacheResult<CachedValue> {
        self.registry.get(name)?.get(key, &self.context())
    }

    /// Current value of `field` of `key` in cache `name`.
    ///
    /// # Errors
    ///
    /// Propagates the lookup failure of the cache.
    pub fn get_value(&self, name: &str, key: &str, field: &str) -> CacheResult<FieldValue> {
        self.registry.get(name)?.get_value(key, field, &self.context())
    }

    /// Cache a freshly created fixture and register its `@` alias.
    ///
    /// The alias field is stripped before the record is stored. The fixture
    /// stays tracked even when registering the alias fails, so it is still
    /// torn down.
    ///
    /// # Errors
    ///
    /// Fails when the record has no primary key for this cache, the key is
    /// already cached, or the alias cannot be stored.
    pub fn track(&mut self, cache_name: &str, mut record: Record) -> CacheResult<CacheKey> {
        let alias = extract_alias_key(&mut record);
        let cache = self.registry.get_mut(cache_name)?;
        let Some(key) = cache.key_for(&record) else {
            return Err(cache.store().invalid_key(
                CacheOp::Add,
                String::new(),
                "record carries no primary key for this cache",
            ));
        };
        let key = cache.add(key, Some(record))?;
        if let Some(alias) = alias {
            let aliases = self.alias_cache_mut(&alias)?;
            let mut pointer = Record::new();
            pointer.insert(ALIAS_CACHE_FIELD.to_owned(), cache_name.into());
            pointer.insert(ALIAS_VALUE_FIELD.to_owned(), key.as_str().into());
            aliases.add(CacheKey::from(alias), Some(pointer))?;
        }
        Ok(key)
    }

    /// Map an `@:name` reference to the key it aliases. Other values are
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Fails when the alias is unknown or no alias cache is configured.
    pub fn resolve_reference(&self, value: &str) -> CacheResult<String> {
        let Some(alias) = alias_reference(value) else {
            return Ok(value.to_owned());
        };
        let name = self.alias_cache.as_deref().ok_or_else(|| CacheError::NoAliasCache {
            alias: alias.to_owned(),
        })?;
        let aliases = self.registry.get(name)?;
        aliases
            .store()
            .get(alias, CacheOp::Get)?
            .as_alias()
            .map(|pointer| pointer.target_key.to_string())
            .ok_or_else(|| aliases.store().not_found(CacheOp::Get, alias))
    }

    /// Run the backing system's maintenance tasks.
    ///
    /// # Errors
    ///
    /// Propagates the driver failure.
    pub fn run_cron(&self) -> Result<(), DriverError> {
        self.driver.run_cron()
    }

    /// Clear the backing system's caches.
    ///
    /// # Errors
    ///
    /// Propagates the driver failure.
    pub fn clear_cache(&self) -> Result<(), DriverError> {
        self.driver.clear_cache()
    }

    /// Clean every cache. The scenario can keep tracking fixtures afterwards.
    pub fn teardown(&mut self) -> TeardownReport {
        CleanupOrchestrator::run(&mut self.registry, &self.driver)
    }

    fn alias_cache_mut(&mut self, alias: &str) -> CacheResult<&mut dyn FixtureCache> {
        let Some(name) = self.alias_cache.as_deref() else {
            return Err(CacheError::NoAliasCache {
                alias: alias.to_owned(),
            });
        };
        self.registry.get_mut(name)
    }
}

impl<D: Driver> Drop for Scenario<D> {
    fn drop(&mut self) {
        if self.registry.iter().all(|cache| cache.count() == 0) {
            return;
        }
        let report = self.teardown();
        if !report.is_clean() {
            tracing::warn!(
                failed = report.failures().len(),
                "scenario dropped with fixtures that could not be torn down"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::FixtureKind;
    use crate::driver::mock::MockDriver;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn scenario(driver: MockDriver) -> Scenario<MockDriver> {
        Scenario::from_config(driver, &ScenarioConfig::default()).expect("default layout")
    }

    #[rstest]
    fn tracked_aliases_resolve_to_their_key() {
        let mut driver = MockDriver::new();
        driver.expect_delete().times(1).returning(|_, _, _| Ok(()));
        driver.expect_process_batch().times(1).returning(|| Ok(()));
        let mut scenario = scenario(driver);

        let key = scenario
            .track("users", record(json!({"uid": 8, "name": "editor", "@": "ed"})))
            .expect("track");
        assert_eq!(key.as_str(), "8");
        assert_eq!(scenario.resolve_reference("@:ed").expect("alias"), "8");
        assert_eq!(scenario.resolve_reference("plain").expect("passthrough"), "plain");
        let err = scenario.resolve_reference("@:nobody").expect_err("unknown alias");
        assert!(matches!(err, CacheError::NotFound { .. }), "{err}");

        let report = scenario.teardown();
        assert!(report.is_clean());
        assert_eq!(scenario.cache("aliases").map(|c| c.count()).ok(), Some(0));
    }

    #[rstest]
    fn stored_records_lose_their_alias_field() {
        let mut driver = MockDriver::new();
        driver
            .expect_load()
            .withf(|kind, key| *kind == FixtureKind::Node && key.as_str() == "3")
            .returning(|_, _| Ok(Some(record(json!({"nid": 3, "title": "Live"})))));
        driver
            .expect_delete()
            .withf(|_, _, record| !record.contains_key("@"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut scenario = scenario(driver);

        scenario
            .track("nodes", record(json!({"nid": 3, "title": "Draft", "@": "page"})))
            .expect("track");
        assert_eq!(
            scenario.get_value("aliases", "page", "title").expect("via alias"),
            json!("Live")
        );
        assert!(scenario.teardown().is_clean());
    }

    #[rstest]
    fn tracking_needs_a_primary_key() {
        let mut scenario = scenario(MockDriver::new());
        let err = scenario
            .track("roles", record(json!({"label": "Editor"})))
            .expect_err("no rid");
        assert!(matches!(err, CacheError::InvalidKey { .. }), "{err}");
        let err = scenario
            .track("widgets", record(json!({"id": 1})))
            .expect_err("no such cache");
        assert!(matches!(err, CacheError::UnknownCache { .. }), "{err}");
    }

    #[rstest]
    fn aliases_need_an_alias_cache() {
        let mut driver = MockDriver::new();
        driver.expect_delete().times(1).returning(|_, _, _| Ok(()));
        let config = ScenarioConfig {
            alias_cache: None,
            ..ScenarioConfig::default()
        };
        let mut scenario = Scenario::from_config(driver, &config).expect("layout");
        let err = scenario
            .track("roles", record(json!({"rid": "editor", "@": "ed"})))
            .expect_err("alias without alias cache");
        assert!(matches!(err, CacheError::NoAliasCache { .. }), "{err}");
        assert_eq!(scenario.cache("roles").map(|c| c.count()).ok(), Some(1));
        let err = scenario.resolve_reference("@:ed").expect_err("no alias cache");
        assert!(matches!(err, CacheError::NoAliasCache { .. }), "{err}");
    }

    #[rstest]
    fn dropping_a_scenario_tears_it_down() {
        let mut driver = MockDriver::new();
        driver
            .expect_delete()
            .withf(|kind, key, _| *kind == FixtureKind::Language && key.as_str() == "fr")
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut scenario = scenario(driver);
        scenario
            .track("languages", record(json!({"langcode": "fr"})))
            .expect("track");
        drop(scenario);
    }

    #[rstest]
    fn maintenance_calls_pass_through() {
        let mut driver = MockDriver::new();
        driver.expect_run_cron().times(1).returning(|| Ok(()));
        driver
            .expect_clear_cache()
            .times(1)
            .returning(|| Err(DriverError::Backend("cache bin locked".into())));
        let scenario = scenario(driver);
        scenario.run_cron().expect("cron");
        assert!(scenario.clear_cache().is_err());
    }
}
