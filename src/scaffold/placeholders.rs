// src/scaffold/placeholders.rs

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::anyhow;
use regex::{Captures, Regex};

use crate::errors::{ConfigError, Result};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid regex"));

/// How many occurrences of each `{{key}}` get replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderMode {
    /// Every occurrence.
    #[default]
    All,
    /// Only the first occurrence of each key; later ones stay verbatim.
    First,
}

/// Key/value pairs substituted into the scaffolded configuration file.
///
/// Always carries `quartzVersion` and `name`; more scalar entries can be
/// added. Insertion order is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    entries: Vec<(String, String)>,
}

impl SeedConfig {
    pub fn new(quartz_version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entries: vec![
                ("quartzVersion".to_string(), quartz_version.into()),
                ("name".to_string(), name.into()),
            ],
        }
    }

    /// Add or replace an entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Merge the scalar entries of a TOML table, e.g. the contents of a
    /// `--seed` file. Arrays and tables are rejected.
    pub fn extend_from_toml(mut self, text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)?;
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    return Err(ConfigError::Other(anyhow!(
                        "seed entry `{key}` must be a string, number, boolean or date"
                    )));
                }
            };
            self = self.with(key, value);
        }
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Replace `{{key}}` tokens with seed values in a single pass.
///
/// Substituted values are never rescanned. Tokens without a seed entry are
/// left as they are, and seed entries without a token are ignored.
pub fn substitute(text: &str, seed: &SeedConfig, mode: PlaceholderMode) -> String {
    let mut used: HashSet<String> = HashSet::new();
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| {
            let key = &caps[1];
            match seed.get(key) {
                Some(value) if mode == PlaceholderMode::All || used.insert(key.to_string()) => {
                    value.to_string()
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}
