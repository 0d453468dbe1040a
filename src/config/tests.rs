use super::*;
use rstest::rstest;

#[rstest]
fn default_layout_covers_every_fixture_kind() {
    let config = ScenarioConfig::default();
    let registry = config.build_registry().expect("default layout builds");
    assert_eq!(
        registry.cleanup_order(),
        ["aliases", "nodes", "terms", "users", "roles", "languages"]
    );
    let users = registry.get("users").expect("users cache");
    assert_eq!(users.get_named_indices(), ["name", "mail"]);
    assert_eq!(users.get_entity_type(), Some("user"));
    assert!(config.dangling_siblings().is_empty());
}

#[rstest]
fn yaml_layouts_are_parsed() {
    let config = ScenarioConfig::from_yaml_str(
        "alias_cache: refs\n\
         caches:\n\
         \x20 - name: accounts\n\
         \x20   kind: user\n\
         \x20   indices: [name]\n\
         \x20 - name: notes\n\
         \x20   kind: core\n\
         \x20 - name: refs\n\
         \x20   kind: referential\n\
         \x20   siblings: [accounts, pages]\n",
    )
    .expect("parse");
    assert_eq!(config.alias_cache.as_deref(), Some("refs"));
    assert_eq!(config.caches.len(), 3);
    assert_eq!(config.caches[1].kind, CacheKindConfig::Core);
    assert_eq!(
        config.dangling_siblings(),
        [("refs".to_owned(), "pages".to_owned())]
    );
    let registry = config.build_registry().expect("build");
    assert_eq!(registry.names().collect::<Vec<_>>(), ["accounts", "notes", "refs"]);
}

#[rstest]
#[case("caches:\n  - name: x\n    kind: widget\n")]
#[case("caches:\n  - name: x\n    kind: core\n    colour: red\n")]
#[case("caches: [unterminated\n")]
fn malformed_yaml_is_a_parse_error(#[case] yaml: &str) {
    let err = ScenarioConfig::from_yaml_str(yaml).expect_err("invalid");
    assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
}

#[rstest]
fn referential_caches_reject_indices() {
    let config = ScenarioConfig {
        alias_cache: None,
        caches: vec![CacheConfig::new(
            "refs",
            CacheKindConfig::Referential,
            &["name"],
            &["users"],
        )],
    };
    let err = config.build_registry().expect_err("indices on referential");
    assert!(matches!(err, ConfigError::IndicesOnReferential { .. }), "{err}");
}

#[rstest]
#[case(&["users", "aliases"])]
#[case(&["refs"])]
fn referential_caches_cannot_point_into_referential_caches(#[case] siblings: &[&str]) {
    let config = ScenarioConfig {
        alias_cache: Some("aliases".to_owned()),
        caches: vec![
            CacheConfig::new("users", CacheKindConfig::User, &[], &[]),
            CacheConfig::new("refs", CacheKindConfig::Referential, &[], &["users"]),
            CacheConfig::new("aliases", CacheKindConfig::Referential, &[], siblings),
        ],
    };
    let err = config.build_registry().expect_err("chained aliases");
    assert!(
        matches!(err, ConfigError::ReferentialSibling { ref cache, .. } if cache == "aliases"),
        "{err}"
    );
}

#[rstest]
fn typed_caches_reject_siblings() {
    let config = ScenarioConfig {
        alias_cache: None,
        caches: vec![CacheConfig::new("users", CacheKindConfig::User, &[], &["nodes"])],
    };
    let err = config.build_registry().expect_err("siblings on user cache");
    assert!(matches!(err, ConfigError::UnexpectedSiblings { .. }), "{err}");
}

#[rstest]
#[case(Some("aliases"))]
#[case(Some("users"))]
fn alias_cache_must_be_a_configured_referential_cache(#[case] alias_cache: Option<&str>) {
    let config = ScenarioConfig {
        alias_cache: alias_cache.map(str::to_owned),
        caches: vec![CacheConfig::new("users", CacheKindConfig::User, &[], &[])],
    };
    let err = config.build_registry().expect_err("bad alias cache");
    assert!(matches!(err, ConfigError::InvalidAliasCache { .. }), "{err}");
}

#[rstest]
fn duplicate_names_fail_to_build() {
    let config = ScenarioConfig {
        alias_cache: None,
        caches: vec![
            CacheConfig::new("users", CacheKindConfig::User, &[], &[]),
            CacheConfig::new("users", CacheKindConfig::Core, &[], &[]),
        ],
    };
    let err = config.build_registry().expect_err("duplicate");
    assert!(
        matches!(
            err,
            ConfigError::Build {
                source: CacheError::DuplicateCache { .. },
                ..
            }
        ),
        "{err}"
    );
}

#[rstest]
fn missing_files_report_their_path() {
    let err = ScenarioConfig::load(Utf8Path::new("/nonexistent/cache.yml")).expect_err("missing");
    assert!(err.to_string().contains("/nonexistent/cache.yml"), "{err}");
}
