mod common;
use crate::common::{init_tracing, write_project, TestResult, MINIMAL_CONFIG};

use std::fs;

use tempfile::tempdir;

use quartz_config::config::ConfigPipeline;
use quartz_config::errors::ConfigError;
use quartz_config::watch::{ConfigWatch, ReloadOutcome};

#[test]
fn unchanged_bundle_is_not_reloaded() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_project(dir.path(), &[("quartz.config.js", MINIMAL_CONFIG)]);

    let mut watch = ConfigWatch::new(ConfigPipeline::new(), dir.path())?;
    assert!(watch.current().is_none());

    assert!(matches!(watch.reload(), ReloadOutcome::Reloaded(_)));
    assert!(matches!(watch.reload(), ReloadOutcome::Unchanged));
    assert_eq!(
        watch.current().map(|c| c.config.configuration.name.as_str()),
        Some("Minimal")
    );
    Ok(())
}

#[test]
fn edits_reload_and_failures_keep_the_last_good_config() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let entry = write_project(dir.path(), &[("quartz.config.js", MINIMAL_CONFIG)]);

    let mut watch = ConfigWatch::new(ConfigPipeline::new(), dir.path())?;
    assert!(matches!(watch.reload(), ReloadOutcome::Reloaded(_)));

    fs::write(&entry, MINIMAL_CONFIG.replace("\"Minimal\"", "\"Edited\""))?;
    match watch.reload() {
        ReloadOutcome::Reloaded(loaded) => {
            assert_eq!(loaded.config.configuration.name, "Edited")
        }
        other => panic!("expected Reloaded, got {other:?}"),
    }

    fs::write(&entry, "export default {")?;
    assert!(matches!(
        watch.reload(),
        ReloadOutcome::Failed(ConfigError::Compile { .. })
    ));
    assert_eq!(
        watch.current().map(|c| c.config.configuration.name.as_str()),
        Some("Edited")
    );
    Ok(())
}

#[test]
fn ignore_patterns_come_from_the_loaded_config() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = MINIMAL_CONFIG.replace("ignorePatterns: []", "ignorePatterns: [\"private\"]");
    write_project(dir.path(), &[("quartz.config.js", config.as_str())]);

    let mut watch = ConfigWatch::new(ConfigPipeline::new(), dir.path())?;
    let private = dir.path().join("private/notes.md");
    let content = dir.path().join("content/index.md");

    assert!(!watch.is_ignored(&private));
    assert!(watch.is_ignored(&dir.path().join(".git/HEAD")));

    assert!(matches!(watch.reload(), ReloadOutcome::Reloaded(_)));
    assert!(watch.is_ignored(&private));
    assert!(!watch.is_ignored(&content));
    assert!(watch.is_ignored(std::path::Path::new("/somewhere/else")));
    Ok(())
}
