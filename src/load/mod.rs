// src/load/mod.rs

//! Module loader.
//!
//! Executes a [`CompiledModule`] and hands back its default export as an
//! unchecked [`Candidate`]. Nothing about its shape is assumed here; that is
//! the validator's job.

pub mod js;

use std::path::Path;

use serde_json::Value;

use crate::compile::CompiledModule;
use crate::errors::Result;

pub use js::JsModuleLoader;

/// Key marking values JSON cannot express (functions, `undefined`, ...).
pub const OPAQUE_TAG: &str = "$quartz";

/// Anything that can execute compiled code and return its default export.
///
/// Implementations must not share state between calls: loading the same
/// identity twice runs the code twice.
pub trait ModuleLoader {
    fn load(&self, module: &CompiledModule, identity: &Path) -> Result<Candidate>;
}

impl<L: ModuleLoader + ?Sized> ModuleLoader for &L {
    fn load(&self, module: &CompiledModule, identity: &Path) -> Result<Candidate> {
        (**self).load(module, identity)
    }
}

/// The raw default export of a configuration module.
///
/// Plain data is kept as JSON; anything else is encoded as an object tagged
/// with [`OPAQUE_TAG`], e.g. `{"$quartz": "function", "name": "Content"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    value: Value,
}

impl Candidate {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for Candidate {
    fn from(value: Value) -> Self {
        Candidate::new(value)
    }
}

/// A value this crate only checks for presence: a component or a plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum OpaqueRef {
    /// A callable, identified by its `name` property if it had one.
    Function { name: Option<String> },
    /// Any other value, kept as loaded.
    Value(Value),
}

impl OpaqueRef {
    pub fn from_value(value: &Value) -> Self {
        match opaque_kind(value) {
            Some("function") => OpaqueRef::Function {
                name: value
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            },
            _ => OpaqueRef::Value(value.clone()),
        }
    }

    /// Best-effort display name.
    pub fn name(&self) -> Option<&str> {
        match self {
            OpaqueRef::Function { name } => name.as_deref(),
            OpaqueRef::Value(value) => value.get("name").and_then(Value::as_str),
        }
    }
}

/// The tag of an opaque value, e.g. `Some("undefined")`.
pub fn opaque_kind(value: &Value) -> Option<&str> {
    value.as_object()?.get(OPAQUE_TAG)?.as_str()
}
