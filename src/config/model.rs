// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::load::OpaqueRef;

/// A configuration that passed every structural and schema check.
///
/// Only [`crate::config::validate::validate`] builds one, so holding a
/// `ValidatedConfig` means the contract below holds:
///
/// ```js
/// export default {
///   plugins: [ /* plugin descriptors */ ],
///   configuration: { quartzVersion: "4.0.0", name: "My Site", ignorePatterns: [] },
///   components: { pageSingle, pageList, pageHome, document },
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    /// Plugin descriptors in declaration order.
    pub plugins: Vec<PluginDescriptor>,

    /// The data-only `configuration` object.
    pub configuration: SiteConfiguration,

    /// The four required page components.
    pub components: ComponentSlots,

    /// The configuration file this was loaded from.
    pub source: PathBuf,
}

/// `configuration` sub-object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfiguration {
    /// Tool version this configuration was written for.
    pub quartz_version: String,

    /// Site name.
    pub name: String,

    /// Glob-like path exclusions.
    pub ignore_patterns: Vec<String>,

    /// Fields beyond the required ones, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `components` mapping. Values are never inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSlots {
    pub page_single: OpaqueRef,
    pub page_list: OpaqueRef,
    pub page_home: OpaqueRef,
    pub document: OpaqueRef,
}

impl ComponentSlots {
    /// `(key, component)` pairs in the order the keys are documented.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OpaqueRef)> {
        [
            ("pageSingle", &self.page_single),
            ("pageList", &self.page_list),
            ("pageHome", &self.page_home),
            ("document", &self.document),
        ]
        .into_iter()
    }
}

/// Opaque plugin descriptor, consumed by the plugin system.
pub type PluginDescriptor = OpaqueRef;
