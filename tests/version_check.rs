mod common;
use crate::common::{init_tracing, TestResult};

use std::sync::Arc;

use serde_json::json;

use quartz_config::config::{check_version, ConfigPipeline, QUARTZ_VERSION, SCHEMA_REFERENCE_URL};
use quartz_config::fs::mock::MockFileSystem;
use quartz_config_test_utils::builders::CandidateBuilder;
use quartz_config_test_utils::fakes::{CountingCompiler, CountingLoader};

fn pipeline_declaring(
    version: &str,
) -> ConfigPipeline<CountingCompiler, CountingLoader> {
    let fs = MockFileSystem::new();
    fs.add_file("/site/quartz/quartz.config.js", "export default {}");
    let candidate = CandidateBuilder::new()
        .configuration_field("quartzVersion", json!(version))
        .build();
    ConfigPipeline::with_parts(CountingCompiler::new("bundle"), CountingLoader::new(candidate))
        .with_fs(Arc::new(fs))
}

#[test]
fn mismatch_is_reported_without_failing() -> TestResult {
    init_tracing();

    let loaded = pipeline_declaring("4.0.0")
        .with_tool_version("3.9.0")
        .load("/site")?;

    let mismatch = loaded.version_mismatch.expect("versions differ");
    assert_eq!(mismatch.declared, "4.0.0");
    assert_eq!(mismatch.running, "3.9.0");
    assert!(mismatch.to_string().contains(SCHEMA_REFERENCE_URL));
    assert_eq!(loaded.config.configuration.quartz_version, "4.0.0");
    Ok(())
}

#[test]
fn matching_version_is_silent() -> TestResult {
    init_tracing();

    let loaded = pipeline_declaring(QUARTZ_VERSION).load("/site")?;
    assert_eq!(loaded.version_mismatch, None);
    Ok(())
}

#[test]
fn comparison_is_exact() {
    assert!(check_version("4.0.0", "4.0.0").is_none());
    assert!(check_version("4.0", "4.0.0").is_some());
    assert!(check_version("v4.0.0", "4.0.0").is_some());
}
