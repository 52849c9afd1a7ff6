// src/compile/transform.rs

//! Per-module source transform.
//!
//! Every stage works on tokens (strings, templates, comments and regex
//! literals are opaque) and keeps line numbers intact:
//! 1. `.jsx`/`.tsx`: JSX elements become factory calls ([`jsx`]).
//! 2. `.ts`/`.tsx`/`.mts`: type syntax is erased ([`typescript`]).
//! 3. `import`/`export` are lowered onto the bundle runtime ([`modules`]).
//!
//! JSON modules skip all three and become a single default export.

use std::path::Path;

use anyhow::{bail, Result};

use crate::compile::jsx::{self, JsxOptions};
use crate::compile::{modules, typescript};

/// How a module's source is interpreted, from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    JavaScript { jsx: bool },
    TypeScript { jsx: bool },
    Json,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        Ok(match ext {
            "js" | "mjs" => SourceKind::JavaScript { jsx: false },
            "jsx" => SourceKind::JavaScript { jsx: true },
            "ts" | "mts" => SourceKind::TypeScript { jsx: false },
            "tsx" => SourceKind::TypeScript { jsx: true },
            "json" => SourceKind::Json,
            "cjs" | "cts" => bail!("CommonJS modules are not supported"),
            "" => bail!("cannot tell the module type of a file without an extension"),
            other => bail!("unsupported module type '.{other}'"),
        })
    }

    fn jsx(self) -> bool {
        matches!(self, SourceKind::JavaScript { jsx: true } | SourceKind::TypeScript { jsx: true })
    }
}

/// Options shared by every module in a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub jsx: JsxOptions,
}

/// A module body ready for the bundle runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedModule {
    /// Script body; expects `__exports`, `__import`, `__dynamicImport` and
    /// `__meta` in scope.
    pub body: String,
    /// Import specifiers, static imports first in order of appearance.
    pub specifiers: Vec<String>,
}

pub fn transform_module(source: &str, kind: SourceKind, options: &TransformOptions) -> Result<TransformedModule> {
    if kind == SourceKind::Json {
        let document: serde_json::Value = serde_json::from_str(source)
            .map_err(|err| anyhow::anyhow!("invalid JSON: {err}"))?;
        return Ok(TransformedModule {
            body: json_module(&document),
            specifiers: Vec::new(),
        });
    }

    // A hashbang is only valid at the very start of a script.
    let mut text = match source.strip_prefix("#!") {
        Some(rest) => format!("//{rest}"),
        None => source.to_string(),
    };
    if kind.jsx() {
        text = jsx::transform(&text, &options.jsx)?;
    }
    if matches!(kind, SourceKind::TypeScript { .. }) {
        text = typescript::strip(&text)?;
    }
    let linked = modules::link(&text)?;
    Ok(TransformedModule {
        body: linked.body,
        specifiers: linked.specifiers,
    })
}

pub fn json_module(document: &serde_json::Value) -> String {
    format!("Object.defineProperty(__exports, \"default\", {{ enumerable: true, value: {document} }});\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(source: &str) -> String {
        transform_module(source, SourceKind::TypeScript { jsx: false }, &TransformOptions::default())
            .unwrap()
            .body
    }

    #[test]
    fn kinds_follow_extensions() {
        assert_eq!(SourceKind::from_path(Path::new("a.tsx")).unwrap(), SourceKind::TypeScript { jsx: true });
        assert_eq!(SourceKind::from_path(Path::new("a.mjs")).unwrap(), SourceKind::JavaScript { jsx: false });
        let err = SourceKind::from_path(Path::new("a.cjs")).unwrap_err();
        assert!(err.to_string().contains("CommonJS"));
        assert!(SourceKind::from_path(Path::new("a.css")).is_err());
    }

    #[test]
    fn javascript_is_not_type_stripped() {
        let source = "const a = b ? c : d;\nconst e = { f: 1 };\n";
        let body = transform_module(source, SourceKind::JavaScript { jsx: false }, &TransformOptions::default())
            .unwrap()
            .body;
        assert_eq!(body, source);
    }

    #[test]
    fn typescript_then_modules() {
        let body = ts("import type { QuartzConfig } from \"./cfg\";\nimport { base } from \"./base\";\nconst config: QuartzConfig = { ...base } satisfies QuartzConfig;\nexport default config;\n");
        assert_eq!(
            body,
            "__export(__exports, { \"default\": () => __default }); const __m0 = __import(\"./base\"); \n\nconst config = { ...__m0.base } ;\nconst __default = config;\n"
        );
    }

    #[test]
    fn tsx_uses_the_configured_factory() {
        let options = TransformOptions {
            jsx: JsxOptions {
                factory: "jsx".to_string(),
                fragment: "Frag".to_string(),
            },
        };
        let body = transform_module(
            "export const view = (n: number) => <><b>{n}</b></>;\n",
            SourceKind::TypeScript { jsx: true },
            &options,
        )
        .unwrap()
        .body;
        assert!(body.contains("const view = (n) => jsx(Frag, null, jsx(\"b\", null, n));"), "{body}");
    }

    #[test]
    fn hashbang_becomes_a_comment() {
        let body = ts("#!/usr/bin/env node\nexport const a = 1;\n");
        assert!(body.contains("//usr/bin/env node\nconst a = 1;"), "{body}");
    }

    #[test]
    fn json_is_a_default_export() {
        let body = transform_module("{\"a\": [1, 2]}", SourceKind::Json, &TransformOptions::default())
            .unwrap()
            .body;
        assert_eq!(
            body,
            "Object.defineProperty(__exports, \"default\", { enumerable: true, value: {\"a\":[1,2]} });\n"
        );
    }
}
