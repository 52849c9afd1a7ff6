// tests/error_handling.rs

mod common;
use crate::common::{init_tracing, write_project, MINIMAL_CONFIG};

use tempfile::tempdir;

use quartz_config::compile::{Bundler, ModuleCompiler};
use quartz_config::config::load_config;
use quartz_config::errors::ConfigError;
use quartz_config::load::{JsModuleLoader, ModuleLoader};

fn load_project(files: &[(&str, &str)]) -> ConfigError {
    init_tracing();
    let dir = tempdir().unwrap();
    write_project(dir.path(), files);
    load_config(dir.path()).unwrap_err()
}

#[test]
fn missing_config_points_at_the_expected_path() {
    init_tracing();
    let dir = tempdir().unwrap();

    let err = load_config(dir.path()).unwrap_err();
    match err {
        ConfigError::MissingConfig { path } => {
            assert!(path.ends_with("quartz/quartz.config.js"), "{path:?}");
        }
        other => panic!("expected MissingConfig, got {other:?}"),
    }
}

#[test]
fn syntax_error_is_a_compile_error() {
    let err = load_project(&[("quartz.config.js", "export default { plugins: [ }\n")]);
    match err {
        ConfigError::Compile { path, .. } => assert!(path.ends_with("quartz.config.js")),
        other => panic!("expected Compile, got {other:?}"),
    }
}

#[test]
fn syntax_error_in_an_import_names_that_file() {
    let err = load_project(&[
        ("quartz.config.js", "import broken from \"./broken.js\"\nexport default broken\n"),
        ("broken.js", "export default function ( {\n"),
    ]);
    match err {
        ConfigError::Compile { path, .. } => assert!(path.ends_with("broken.js"), "{path:?}"),
        other => panic!("expected Compile, got {other:?}"),
    }
}

#[test]
fn unresolvable_import_is_a_compile_error() {
    let err = load_project(&[(
        "quartz.config.js",
        "import missing from \"./nowhere\"\nexport default missing\n",
    )]);
    match err {
        ConfigError::Compile { diagnostic, .. } => {
            assert!(diagnostic.contains("./nowhere"), "{diagnostic}");
        }
        other => panic!("expected Compile, got {other:?}"),
    }
}

#[test]
fn host_modules_are_rejected() {
    let err = load_project(&[(
        "quartz.config.js",
        "import fs from \"node:fs\"\nexport default fs\n",
    )]);
    assert!(matches!(err, ConfigError::Compile { .. }), "{err:?}");
}

#[test]
fn circular_imports_load_with_live_bindings() {
    init_tracing();
    let dir = tempdir().unwrap();
    let entry = write_project(
        dir.path(),
        &[
            ("quartz.config.js", "import { describe } from \"./a.js\"\nexport default { text: describe() }\n"),
            (
                "a.js",
                "import { suffix } from \"./b.js\"\nexport const prefix = \"garden\"\nexport function describe() { return prefix + suffix }\n",
            ),
            (
                "b.js",
                "import { prefix } from \"./a.js\"\nexport const suffix = \"-notes\"\nexport function late() { return prefix }\n",
            ),
        ],
    );

    let compiled = Bundler::new().compile(&entry).unwrap();
    let candidate = JsModuleLoader::new().load(&compiled, &entry).unwrap();
    assert_eq!(candidate.value()["text"], "garden-notes");
}

#[test]
fn infinite_loop_is_a_load_error() {
    init_tracing();
    let dir = tempdir().unwrap();
    let entry = write_project(dir.path(), &[("quartz.config.js", "while (true) {}\nexport default {}\n")]);

    let compiled = Bundler::new().compile(&entry).unwrap();
    let err = JsModuleLoader::new()
        .with_loop_iteration_limit(1_000)
        .load(&compiled, &entry)
        .unwrap_err();
    match err {
        ConfigError::Load { message, .. } => assert!(message.contains("loop iteration limit"), "{message}"),
        other => panic!("expected Load, got {other:?}"),
    }
}

#[test]
fn unbounded_recursion_is_a_load_error() {
    let err = load_project(&[(
        "quartz.config.js",
        "function again(n) { return again(n + 1) }\nexport default again(0)\n",
    )]);
    match err {
        ConfigError::Load { message, .. } => assert!(message.contains("recursive calls"), "{message}"),
        other => panic!("expected Load, got {other:?}"),
    }
}

#[test]
fn top_level_throw_is_a_load_error() {
    let err = load_project(&[(
        "quartz.config.js",
        "throw new Error(\"boom at load\")\nexport default {}\n",
    )]);
    match err {
        ConfigError::Load { message, .. } => assert!(message.contains("boom at load"), "{message}"),
        other => panic!("expected Load, got {other:?}"),
    }
}

#[test]
fn missing_default_export_is_a_load_error() {
    let err = load_project(&[("quartz.config.js", "export const config = {}\n")]);
    match err {
        ConfigError::Load { message, .. } => {
            assert!(message.contains("no default export"), "{message}")
        }
        other => panic!("expected Load, got {other:?}"),
    }
}

#[test]
fn structural_errors_surface_from_real_modules() {
    let config = MINIMAL_CONFIG.replace("    pageHome: \"home\",\n", "");
    let err = load_project(&[("quartz.config.js", config.as_str())]);
    assert!(
        matches!(&err, ConfigError::MissingComponent { key } if key == "pageHome"),
        "{err:?}"
    );

    let config = MINIMAL_CONFIG.replace("ignorePatterns: []", "ignorePatterns: \"private\"");
    let err = load_project(&[("quartz.config.js", config.as_str())]);
    assert!(matches!(err, ConfigError::SchemaValidation { .. }), "{err:?}");
}

#[test]
fn every_pipeline_error_has_a_hint() {
    let errors = [
        ConfigError::MissingConfig { path: "/x".into() },
        ConfigError::compile("/x", "bad"),
        ConfigError::load("/x", "bad"),
        ConfigError::MissingKey { key: "plugins".into() },
        ConfigError::MissingComponent { key: "document".into() },
        ConfigError::SchemaValidation { message: "bad".into() },
        ConfigError::scaffold("/x", "bad"),
    ];
    for err in errors {
        assert!(err.hint().is_some(), "no hint for {err:?}");
    }
}
