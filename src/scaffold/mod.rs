// src/scaffold/mod.rs

//! Project scaffolding: copy the bundled template into `{root}/quartz` and
//! personalise the copied configuration file.

pub mod placeholders;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{ConfigError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::{resolve_config_dir, resolve_config_file};

pub use placeholders::{substitute, PlaceholderMode, SeedConfig};

/// Environment variable overriding the template directory.
pub const TEMPLATE_DIR_ENV: &str = "QUARTZ_TEMPLATE_DIR";

/// `QUARTZ_TEMPLATE_DIR` if set, otherwise the `template/` directory shipped
/// next to this crate's manifest.
pub fn default_template_dir() -> PathBuf {
    std::env::var_os(TEMPLATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("template"))
}

#[derive(Debug, Clone)]
pub struct Scaffolder<F: FileSystem = RealFileSystem> {
    fs: F,
    template_dir: PathBuf,
    mode: PlaceholderMode,
}

impl Scaffolder<RealFileSystem> {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self::with_fs(RealFileSystem, template_dir)
    }
}

impl<F: FileSystem> Scaffolder<F> {
    pub fn with_fs(fs: F, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            template_dir: template_dir.into(),
            mode: PlaceholderMode::default(),
        }
    }

    pub fn placeholder_mode(mut self, mode: PlaceholderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Copy the template into `{root}/quartz` and substitute `seed` into the
    /// copied `quartz.config.js`. Returns the path of that file.
    ///
    /// Existing files are overwritten, so running this twice gives the same
    /// result. A failed copy is not rolled back.
    pub fn scaffold(&self, root: impl AsRef<Path>, seed: &SeedConfig) -> Result<PathBuf> {
        let root = root.as_ref();
        let config_dir = resolve_config_dir(root);

        if !self.fs.is_dir(&self.template_dir) {
            return Err(ConfigError::scaffold(
                &self.template_dir,
                "template directory does not exist",
            ));
        }

        let copied = self.copy_tree(&self.template_dir, &config_dir)?;
        info!(
            template = %self.template_dir.display(),
            target = %config_dir.display(),
            files = copied,
            "copied template"
        );

        let config_file = resolve_config_file(root);
        if !self.fs.is_file(&config_file) {
            return Err(ConfigError::scaffold(
                &config_file,
                "template does not contain a quartz.config.js",
            ));
        }

        let text = self
            .fs
            .read_to_string(&config_file)
            .map_err(|err| ConfigError::scaffold(&config_file, err))?;
        let text = substitute(&text, seed, self.mode);
        self.fs
            .write(&config_file, text.as_bytes())
            .map_err(|err| ConfigError::scaffold(&config_file, err))?;

        Ok(config_file)
    }

    /// Recursively copy `from` into `to`, returning the number of files.
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<usize> {
        self.fs
            .create_dir_all(to)
            .map_err(|err| ConfigError::scaffold(to, err))?;

        let entries = self
            .fs
            .read_dir(from)
            .map_err(|err| ConfigError::scaffold(from, err))?;

        let mut copied = 0;
        for entry in entries {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let target = to.join(name);
            if self.fs.is_dir(&entry) {
                copied += self.copy_tree(&entry, &target)?;
            } else {
                debug!(from = %entry.display(), to = %target.display(), "copying");
                let contents = self
                    .fs
                    .read(&entry)
                    .map_err(|err| ConfigError::scaffold(&entry, err))?;
                self.fs
                    .write(&target, &contents)
                    .map_err(|err| ConfigError::scaffold(&target, err))?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}
