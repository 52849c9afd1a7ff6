#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub use quartz_config_test_utils::init_tracing;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A configuration that needs no imports and passes validation.
pub const MINIMAL_CONFIG: &str = r#"
export default {
  plugins: [],
  configuration: {
    quartzVersion: "4.0.0",
    name: "Minimal",
    ignorePatterns: [],
  },
  components: {
    pageSingle: "single",
    pageList: "list",
    pageHome: "home",
    document: "document",
  },
}
"#;

/// Write `files` (paths relative to `{root}/quartz`) and return the path of
/// the configuration entry file.
pub fn write_project(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    let config_dir = root.join("quartz");
    for (name, contents) in files {
        let path = config_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
    }
    config_dir.join("quartz.config.js")
}

/// The template shipped with the crate.
pub fn bundled_template() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("template")
}
