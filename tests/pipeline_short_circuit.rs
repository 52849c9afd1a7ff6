mod common;
use crate::common::{init_tracing, TestResult};

use std::sync::atomic::Ordering;
use std::sync::Arc;

use quartz_config::config::ConfigPipeline;
use quartz_config::errors::ConfigError;
use quartz_config::fs::mock::MockFileSystem;
use quartz_config_test_utils::builders::CandidateBuilder;
use quartz_config_test_utils::fakes::{CountingCompiler, CountingLoader};

const ENTRY: &str = "/site/quartz/quartz.config.js";

#[test]
fn missing_config_never_reaches_compiler_or_loader() {
    init_tracing();

    let compiler = CountingCompiler::new("irrelevant");
    let loader = CountingLoader::new(CandidateBuilder::new().build());
    let (compiles, loads) = (compiler.calls(), loader.calls());

    let pipeline =
        ConfigPipeline::with_parts(compiler, loader).with_fs(Arc::new(MockFileSystem::new()));

    let err = pipeline.load("/site").unwrap_err();
    match err {
        ConfigError::MissingConfig { path } => assert_eq!(path.to_str(), Some(ENTRY)),
        other => panic!("expected MissingConfig, got {other:?}"),
    }
    assert_eq!(compiles.load(Ordering::SeqCst), 0);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn each_load_compiles_and_executes_again() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file(ENTRY, "export default {}");

    let compiler = CountingCompiler::new("bundle");
    let loader = CountingLoader::new(CandidateBuilder::new().build());
    let (compiles, loads) = (compiler.calls(), loader.calls());
    let pipeline = ConfigPipeline::with_parts(compiler, loader).with_fs(Arc::new(fs));

    let first = pipeline.load("/site")?;
    let second = pipeline.load("/site")?;

    assert_eq!(first, second);
    assert_eq!(compiles.load(Ordering::SeqCst), 2);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn validation_failure_is_reported_after_loading() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file(ENTRY, "export default {}");

    let loader = CountingLoader::new(CandidateBuilder::new().without_key("components").build());
    let pipeline =
        ConfigPipeline::with_parts(CountingCompiler::new("bundle"), loader).with_fs(Arc::new(fs));

    let err = pipeline.load("/site").unwrap_err();
    assert!(
        matches!(&err, ConfigError::MissingKey { key } if key == "components"),
        "unexpected error: {err:?}"
    );
    assert!(err.hint().is_some());
}
