// src/watch/reload.rs

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::compile::ModuleCompiler;
use crate::config::{ConfigPipeline, LoadedConfig};
use crate::errors::ConfigError;
use crate::load::ModuleLoader;
use crate::watch::ignore::{relative_str, IgnoreMatcher};

/// What a reload attempt did.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The compiled bundle is byte-identical to the last good one.
    Unchanged,
    Reloaded(LoadedConfig),
    /// The previous configuration stays current.
    Failed(ConfigError),
}

/// Keeps the last good configuration of a project and reloads it on demand.
///
/// Each reload recompiles the configuration; the bundle's digest decides
/// whether it needs to be executed and validated again.
#[derive(Debug)]
pub struct ConfigWatch<C, L> {
    pipeline: ConfigPipeline<C, L>,
    root: PathBuf,
    digest: Option<String>,
    current: Option<LoadedConfig>,
    ignore: IgnoreMatcher,
}

impl<C: ModuleCompiler, L: ModuleLoader> ConfigWatch<C, L> {
    pub fn new(pipeline: ConfigPipeline<C, L>, root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Ok(Self {
            pipeline,
            root: root.into(),
            digest: None,
            current: None,
            ignore: IgnoreMatcher::new::<&str>(&[])?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current(&self) -> Option<&LoadedConfig> {
        self.current.as_ref()
    }

    /// Whether a change at `path` can be skipped.
    pub fn is_ignored(&self, path: &Path) -> bool {
        match relative_str(&self.root, path) {
            Some(relative) => self.ignore.is_ignored(&relative),
            None => true,
        }
    }

    pub fn reload(&mut self) -> ReloadOutcome {
        let (config_file, compiled) = match self.pipeline.compile(&self.root) {
            Ok(compiled) => compiled,
            Err(err) => return ReloadOutcome::Failed(err),
        };

        let digest = compiled.digest();
        if self.digest.as_deref() == Some(digest.as_str()) {
            debug!(%digest, "configuration bundle unchanged");
            return ReloadOutcome::Unchanged;
        }

        let loaded = match self.pipeline.load_compiled(&config_file, &compiled) {
            Ok(loaded) => loaded,
            Err(err) => return ReloadOutcome::Failed(err),
        };

        match IgnoreMatcher::new(&loaded.config.configuration.ignore_patterns[..]) {
            Ok(ignore) => self.ignore = ignore,
            Err(err) => warn!("keeping previous ignore patterns: {err:#}"),
        }
        self.digest = Some(digest);
        self.current = Some(loaded.clone());
        ReloadOutcome::Reloaded(loaded)
    }
}
