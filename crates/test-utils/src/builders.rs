#![allow(dead_code)]

use serde_json::{json, Value};
use quartz_config::load::Candidate;

/// Builder for a loaded configuration candidate.
///
/// Starts out structurally valid; the setters break or extend it.
pub struct CandidateBuilder {
    value: Value,
}

impl CandidateBuilder {
    pub fn new() -> Self {
        Self {
            value: json!({
                "plugins": [
                    { "name": "FrontMatter", "options": {} },
                    { "name": "ContentIndex", "options": { "rss": true } }
                ],
                "configuration": {
                    "quartzVersion": "4.0.0",
                    "name": "My Garden",
                    "ignorePatterns": ["private", ".obsidian"]
                },
                "components": {
                    "pageSingle": function("ContentPage"),
                    "pageList": function("ListPage"),
                    "pageHome": function("HomePage"),
                    "document": function("Document")
                }
            }),
        }
    }

    pub fn without_key(mut self, key: &str) -> Self {
        if let Some(root) = self.value.as_object_mut() {
            root.remove(key);
        }
        self
    }

    pub fn without_component(mut self, key: &str) -> Self {
        if let Some(components) = self.value["components"].as_object_mut() {
            components.remove(key);
        }
        self
    }

    pub fn configuration_field(mut self, key: &str, value: Value) -> Self {
        self.value["configuration"][key] = value;
        self
    }

    pub fn without_configuration_field(mut self, key: &str) -> Self {
        if let Some(configuration) = self.value["configuration"].as_object_mut() {
            configuration.remove(key);
        }
        self
    }

    pub fn plugins(mut self, plugins: Value) -> Self {
        self.value["plugins"] = plugins;
        self
    }

    pub fn build(self) -> Candidate {
        Candidate::new(self.value)
    }

    pub fn build_value(self) -> Value {
        self.value
    }
}

impl Default for CandidateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// How the loader encodes a named function.
pub fn function(name: &str) -> Value {
    json!({ "$quartz": "function", "name": name })
}
