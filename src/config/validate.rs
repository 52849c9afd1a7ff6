// src/config/validate.rs

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::model::{ComponentSlots, PluginDescriptor, SiteConfiguration, ValidatedConfig};
use crate::config::schema::{check, CONFIGURATION_SCHEMA};
use crate::errors::{ConfigError, Result};
use crate::load::{Candidate, OpaqueRef};

/// Keys the default export must have, checked in this order.
pub const REQUIRED_KEYS: [&str; 3] = ["plugins", "configuration", "components"];

/// Keys `components` must have, checked in this order.
pub const REQUIRED_COMPONENTS: [&str; 4] = ["pageSingle", "pageList", "pageHome", "document"];

/// Gate a loaded candidate.
///
/// Checks run in a fixed order and stop at the first failing step:
/// 1. top-level keys ([`ConfigError::MissingKey`]),
/// 2. component slots ([`ConfigError::MissingComponent`]),
/// 3. the `configuration` schema ([`ConfigError::SchemaValidation`]).
///
/// Step 3 reports every mismatched field of `configuration` at once.
pub fn validate(candidate: Candidate, source: &Path) -> Result<ValidatedConfig> {
    let mut root = match candidate.into_value() {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    ensure_top_level_keys(&root)?;
    ensure_components(&root["components"])?;
    validate_configuration(&root["configuration"])?;

    let components = component_slots(&root["components"]);
    let configuration: SiteConfiguration = serde_json::from_value(root["configuration"].take())
        .map_err(|err| ConfigError::SchemaValidation {
            message: err.to_string(),
        })?;
    let plugins = plugin_descriptors(root["plugins"].take());

    Ok(ValidatedConfig {
        plugins,
        configuration,
        components,
        source: source.to_path_buf(),
    })
}

fn ensure_top_level_keys(root: &Map<String, Value>) -> Result<()> {
    match REQUIRED_KEYS.iter().find(|key| !root.contains_key(**key)) {
        Some(key) => Err(ConfigError::MissingKey {
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn ensure_components(components: &Value) -> Result<()> {
    let present = |key: &str| {
        components
            .as_object()
            .is_some_and(|slots| slots.contains_key(key))
    };
    match REQUIRED_COMPONENTS.iter().find(|key| !present(**key)) {
        Some(key) => Err(ConfigError::MissingComponent {
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_configuration(configuration: &Value) -> Result<()> {
    let issues = check(configuration, "configuration", CONFIGURATION_SCHEMA);
    if issues.is_empty() {
        return Ok(());
    }
    let message = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(ConfigError::SchemaValidation { message })
}

fn component_slots(components: &Value) -> ComponentSlots {
    let slot = |key: &str| OpaqueRef::from_value(&components[key]);
    ComponentSlots {
        page_single: slot("pageSingle"),
        page_list: slot("pageList"),
        page_home: slot("pageHome"),
        document: slot("document"),
    }
}

/// An array yields one descriptor per element; any other value is kept as a
/// single descriptor.
fn plugin_descriptors(plugins: Value) -> Vec<PluginDescriptor> {
    match plugins {
        Value::Array(items) => items.iter().map(OpaqueRef::from_value).collect(),
        other => vec![OpaqueRef::from_value(&other)],
    }
}
