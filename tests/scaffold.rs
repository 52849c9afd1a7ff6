mod common;
use crate::common::{bundled_template, init_tracing, TestResult};

use std::fs;

use tempfile::tempdir;

use quartz_config::config::{load_config, QUARTZ_VERSION};
use quartz_config::errors::ConfigError;
use quartz_config::fs::mock::MockFileSystem;
use quartz_config::fs::FileSystem;
use quartz_config::scaffold::{substitute, PlaceholderMode, Scaffolder, SeedConfig};

const TEMPLATE: &str = "/tpl";
const TEMPLATE_CONFIG: &str = r#"export default {
  configuration: {
    quartzVersion: "{{quartzVersion}}",
    name: "{{name}}",
    pageTitle: "{{name}}",
    baseUrl: "{{baseUrl}}",
  },
}
"#;

fn mock_template() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/tpl/quartz.config.js", TEMPLATE_CONFIG);
    fs.add_file("/tpl/components/page.js", "export default function Page() {}\n");
    fs
}

#[test]
fn placeholders_follow_the_seed() {
    let seed = SeedConfig::new("4.0.0", "My Garden");
    let out = substitute(
        "v{{quartzVersion}} {{name}} {{name}} {{other}}",
        &seed,
        PlaceholderMode::All,
    );
    assert_eq!(out, "v4.0.0 My Garden My Garden {{other}}");

    let out = substitute(
        "v{{quartzVersion}} {{name}} {{name}} {{other}}",
        &seed,
        PlaceholderMode::First,
    );
    assert_eq!(out, "v4.0.0 My Garden {{name}} {{other}}");
}

#[test]
fn substituted_values_are_not_rescanned() {
    let seed = SeedConfig::new("4.0.0", "{{quartzVersion}}");
    let out = substitute("{{name}}", &seed, PlaceholderMode::All);
    assert_eq!(out, "{{quartzVersion}}");
}

#[test]
fn seed_file_adds_scalar_entries() -> TestResult {
    let seed = SeedConfig::new("4.0.0", "Garden")
        .extend_from_toml("baseUrl = \"garden.example.com\"\nport = 8080\nname = \"Renamed\"\n")?;

    assert_eq!(seed.get("baseUrl"), Some("garden.example.com"));
    assert_eq!(seed.get("port"), Some("8080"));
    assert_eq!(seed.get("name"), Some("Renamed"));

    let err = SeedConfig::new("4.0.0", "Garden")
        .extend_from_toml("tags = [\"a\"]\n")
        .unwrap_err();
    assert!(err.to_string().contains("tags"), "{err}");

    let err = SeedConfig::new("4.0.0", "Garden")
        .extend_from_toml("not toml at all")
        .unwrap_err();
    assert!(matches!(err, ConfigError::SeedParse(_)), "{err:?}");
    Ok(())
}

#[test]
fn scaffold_copies_and_substitutes() -> TestResult {
    init_tracing();
    let fs = mock_template();
    let seed = SeedConfig::new("4.0.0", "My Garden").with("baseUrl", "garden.example.com");

    let config_file = Scaffolder::with_fs(fs.clone(), TEMPLATE).scaffold("/site", &seed)?;

    assert_eq!(config_file.to_str(), Some("/site/quartz/quartz.config.js"));
    let written = fs.contents(&config_file).unwrap();
    assert!(written.contains("quartzVersion: \"4.0.0\""));
    assert!(written.contains("name: \"My Garden\""));
    assert!(written.contains("pageTitle: \"My Garden\""));
    assert!(written.contains("baseUrl: \"garden.example.com\""));
    assert_eq!(
        fs.contents("/site/quartz/components/page.js").as_deref(),
        Some("export default function Page() {}\n")
    );
    // The template itself is untouched.
    assert_eq!(fs.contents("/tpl/quartz.config.js").as_deref(), Some(TEMPLATE_CONFIG));
    Ok(())
}

#[test]
fn first_only_mode_keeps_later_tokens() -> TestResult {
    let fs = mock_template();
    let seed = SeedConfig::new("4.0.0", "My Garden");

    let config_file = Scaffolder::with_fs(fs.clone(), TEMPLATE)
        .placeholder_mode(PlaceholderMode::First)
        .scaffold("/site", &seed)?;

    let written = fs.contents(&config_file).unwrap();
    assert!(written.contains("name: \"My Garden\""));
    assert!(written.contains("pageTitle: \"{{name}}\""));
    assert!(written.contains("baseUrl: \"{{baseUrl}}\""));
    Ok(())
}

#[test]
fn scaffolding_twice_gives_the_same_result() -> TestResult {
    let fs = mock_template();
    let seed = SeedConfig::new("4.0.0", "My Garden");
    let scaffolder = Scaffolder::with_fs(fs.clone(), TEMPLATE);

    let config_file = scaffolder.scaffold("/site", &seed)?;
    let first = fs.contents(&config_file);
    scaffolder.scaffold("/site", &seed)?;
    assert_eq!(fs.contents(&config_file), first);
    Ok(())
}

#[test]
fn unwritable_target_is_a_scaffold_error() {
    let fs = mock_template();
    fs.deny_writes_under("/site");

    let err = Scaffolder::with_fs(fs, TEMPLATE)
        .scaffold("/site", &SeedConfig::new("4.0.0", "x"))
        .unwrap_err();
    match err {
        ConfigError::ScaffoldCopy { path, reason } => {
            assert!(path.starts_with("/site"), "{path:?}");
            assert!(reason.contains("Permission denied"), "{reason}");
        }
        other => panic!("expected ScaffoldCopy, got {other:?}"),
    }
}

#[test]
fn missing_template_is_a_scaffold_error() {
    let fs = MockFileSystem::new();
    let err = Scaffolder::with_fs(fs.clone(), "/nowhere")
        .scaffold("/site", &SeedConfig::new("4.0.0", "x"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::ScaffoldCopy { .. }), "{err:?}");
    assert!(!fs.exists(std::path::Path::new("/site/quartz")));
}

#[test]
fn template_without_config_file_is_a_scaffold_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/tpl/README.md", "# template");

    let err = Scaffolder::with_fs(fs, TEMPLATE)
        .scaffold("/site", &SeedConfig::new("4.0.0", "x"))
        .unwrap_err();
    match err {
        ConfigError::ScaffoldCopy { path, .. } => assert!(path.ends_with("quartz.config.js")),
        other => panic!("expected ScaffoldCopy, got {other:?}"),
    }
}

#[test]
fn bundled_template_scaffolds_a_loadable_project() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    let config_file = Scaffolder::new(bundled_template())
        .scaffold(dir.path(), &SeedConfig::new(QUARTZ_VERSION, "Fresh Garden"))?;
    let text = fs::read_to_string(&config_file)?;
    assert!(!text.contains("{{"), "unsubstituted placeholder in:\n{text}");

    let loaded = load_config(dir.path())?;
    let config = &loaded.config;
    assert_eq!(config.configuration.name, "Fresh Garden");
    assert_eq!(config.configuration.quartz_version, QUARTZ_VERSION);
    assert!(loaded.version_mismatch.is_none());

    let plugin_names: Vec<_> = config.plugins.iter().filter_map(|p| p.name()).collect();
    assert_eq!(plugin_names, vec!["FrontMatter", "Description", "ContentIndex"]);

    let component_names: Vec<_> = config
        .components
        .iter()
        .map(|(key, component)| (key, component.name()))
        .collect();
    assert_eq!(
        component_names,
        vec![
            ("pageSingle", Some("ContentPage")),
            ("pageList", Some("ListPage")),
            ("pageHome", Some("HomePage")),
            ("document", Some("Document")),
        ]
    );
    Ok(())
}
