// src/config/schema.rs

//! Declarative schema for the data-only `configuration` object.
//!
//! The schema lists the fields that must be present with the right type.
//! Extra fields are allowed.

use std::fmt;

use serde_json::Value;

use crate::load::opaque_kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringSequence,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::StringSequence => "a sequence of strings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Fields every `configuration` object must carry.
pub const CONFIGURATION_SCHEMA: &[FieldRule] = &[
    FieldRule::required("quartzVersion", FieldKind::String),
    FieldRule::required("name", FieldKind::String),
    FieldRule::required("ignorePatterns", FieldKind::StringSequence),
];

/// One schema mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Dotted path, e.g. `configuration.ignorePatterns[1]`.
    pub path: String,
    pub expected: &'static str,
    pub found: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}`: expected {}, found {}",
            self.path, self.expected, self.found
        )
    }
}

/// Check `value` (found at `path`) against `rules`, collecting every issue.
pub fn check(value: &Value, path: &str, rules: &[FieldRule]) -> Vec<SchemaIssue> {
    let Some(object) = value.as_object().filter(|_| opaque_kind(value).is_none()) else {
        return vec![SchemaIssue {
            path: path.to_string(),
            expected: "an object",
            found: describe(Some(value)),
        }];
    };

    let mut issues = Vec::new();
    for rule in rules {
        let field_path = format!("{path}.{}", rule.name);
        let field = object.get(rule.name);
        match (rule.kind, field) {
            (FieldKind::String, Some(Value::String(_))) => {}
            (FieldKind::StringSequence, Some(Value::Array(items))) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        issues.push(SchemaIssue {
                            path: format!("{field_path}[{i}]"),
                            expected: FieldKind::String.expected(),
                            found: describe(Some(item)),
                        });
                    }
                }
            }
            (kind, field) => issues.push(SchemaIssue {
                path: field_path,
                expected: kind.expected(),
                found: describe(field),
            }),
        }
    }
    issues
}

/// Human-readable description of what was found.
fn describe(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "nothing (the field is required)".to_string();
    };
    if let Some(kind) = opaque_kind(value) {
        return match kind {
            "undefined" => "undefined".to_string(),
            other => format!("a {other}"),
        };
    }
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("a boolean ({b})"),
        Value::Number(n) => format!("a number ({n})"),
        Value::String(s) => format!("a string ({s:?})"),
        Value::Array(_) => "a sequence".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}
