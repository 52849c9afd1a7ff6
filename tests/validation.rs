use std::path::Path;

use serde_json::json;

use quartz_config::config::validate;
use quartz_config::errors::ConfigError;
use quartz_config::load::{Candidate, OpaqueRef};
use quartz_config_test_utils::builders::CandidateBuilder;

const SOURCE: &str = "/site/quartz/quartz.config.js";

fn check(candidate: Candidate) -> Result<quartz_config::config::ValidatedConfig, ConfigError> {
    validate(candidate, Path::new(SOURCE))
}

#[test]
fn accepts_a_complete_candidate() {
    let config = check(CandidateBuilder::new().build()).unwrap();

    assert_eq!(config.configuration.name, "My Garden");
    assert_eq!(config.configuration.ignore_patterns, vec!["private", ".obsidian"]);
    assert_eq!(config.plugins.len(), 2);
    assert_eq!(config.plugins[1].name(), Some("ContentIndex"));
    assert_eq!(config.components.page_home.name(), Some("HomePage"));
    assert_eq!(config.source, Path::new(SOURCE));
}

#[test]
fn top_level_keys_are_checked_in_order() {
    let err = check(
        CandidateBuilder::new()
            .without_key("components")
            .without_key("plugins")
            .build(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey { ref key } if key == "plugins"));

    let err = check(CandidateBuilder::new().without_key("configuration").build()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey { ref key } if key == "configuration"));
}

#[test]
fn non_object_export_is_missing_every_key() {
    let err = check(Candidate::new(json!(42))).unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey { ref key } if key == "plugins"));
}

#[test]
fn missing_component_is_named() {
    let err = check(CandidateBuilder::new().without_component("pageHome").build()).unwrap_err();
    match err {
        ConfigError::MissingComponent { key } => assert_eq!(key, "pageHome"),
        other => panic!("expected MissingComponent, got {other:?}"),
    }
}

#[test]
fn components_are_checked_before_configuration() {
    let err = check(
        CandidateBuilder::new()
            .without_component("document")
            .configuration_field("name", json!(7))
            .build(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingComponent { ref key } if key == "document"));
}

#[test]
fn components_are_only_checked_for_presence() {
    let mut value = CandidateBuilder::new().build_value();
    value["components"]["pageList"] = json!(null);

    let config = check(Candidate::new(value)).unwrap();
    assert_eq!(config.components.page_list, OpaqueRef::Value(json!(null)));
}

#[test]
fn ignore_patterns_must_be_a_sequence() {
    let err = check(
        CandidateBuilder::new()
            .configuration_field("ignorePatterns", json!("private"))
            .build(),
    )
    .unwrap_err();
    match err {
        ConfigError::SchemaValidation { message } => {
            assert!(message.contains("configuration.ignorePatterns"), "{message}");
            assert!(message.contains("a sequence of strings"), "{message}");
        }
        other => panic!("expected SchemaValidation, got {other:?}"),
    }
}

#[test]
fn empty_ignore_patterns_are_fine() {
    let config = check(
        CandidateBuilder::new()
            .configuration_field("ignorePatterns", json!([]))
            .build(),
    )
    .unwrap();
    assert!(config.configuration.ignore_patterns.is_empty());
}

#[test]
fn schema_reports_every_issue() {
    let err = check(
        CandidateBuilder::new()
            .without_configuration_field("name")
            .configuration_field("ignorePatterns", json!(["ok", 3]))
            .build(),
    )
    .unwrap_err();
    let message = match err {
        ConfigError::SchemaValidation { message } => message,
        other => panic!("expected SchemaValidation, got {other:?}"),
    };
    assert!(message.contains("`configuration.name`: expected a string, found nothing"), "{message}");
    assert!(message.contains("`configuration.ignorePatterns[1]`"), "{message}");
}

#[test]
fn extra_configuration_fields_are_kept() {
    let config = check(
        CandidateBuilder::new()
            .configuration_field("baseUrl", json!("garden.example.com"))
            .configuration_field("enableSPA", json!(true))
            .build(),
    )
    .unwrap();
    assert_eq!(config.configuration.extra["baseUrl"], json!("garden.example.com"));
    assert_eq!(config.configuration.extra["enableSPA"], json!(true));
    assert!(!config.configuration.extra.contains_key("name"));
}

#[test]
fn plugins_that_are_not_a_sequence_become_one_descriptor() {
    let config = check(
        CandidateBuilder::new()
            .plugins(json!({ "name": "Everything" }))
            .build(),
    )
    .unwrap();
    assert_eq!(config.plugins.len(), 1);
    assert_eq!(config.plugins[0].name(), Some("Everything"));
}
