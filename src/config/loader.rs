// src/config/loader.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::compile::{Bundler, CompiledModule, ModuleCompiler};
use crate::config::model::ValidatedConfig;
use crate::config::validate::validate;
use crate::config::version::{check_version, VersionMismatch, QUARTZ_VERSION};
use crate::errors::{ConfigError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::load::{JsModuleLoader, ModuleLoader};
use crate::paths::resolve_config_file;

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: ValidatedConfig,

    /// Set when `configuration.quartzVersion` differs from the running tool.
    /// Already logged as a warning.
    pub version_mismatch: Option<VersionMismatch>,
}

/// Compile, load, validate and version-check a project's configuration.
///
/// Every call is independent: the compiler re-reads the sources and the
/// loader executes the result in a fresh context, so repeated loads of the
/// same project never observe each other.
#[derive(Debug)]
pub struct ConfigPipeline<C = Bundler, L = JsModuleLoader> {
    compiler: C,
    loader: L,
    fs: Arc<dyn FileSystem>,
    tool_version: String,
}

impl ConfigPipeline {
    pub fn new() -> Self {
        Self::with_parts(Bundler::new(), JsModuleLoader::new())
    }
}

impl Default for ConfigPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ModuleCompiler, L: ModuleLoader> ConfigPipeline<C, L> {
    pub fn with_parts(compiler: C, loader: L) -> Self {
        Self {
            compiler,
            loader,
            fs: Arc::new(RealFileSystem),
            tool_version: QUARTZ_VERSION.to_string(),
        }
    }

    /// Filesystem used for the existence check.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Override the version compared against `configuration.quartzVersion`.
    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    /// Run the whole pipeline for the project at `root`.
    pub fn load(&self, root: impl AsRef<Path>) -> Result<LoadedConfig> {
        let (config_file, compiled) = self.compile(root)?;
        self.load_compiled(&config_file, &compiled)
    }

    /// First half of [`Self::load`]: locate and compile the configuration.
    ///
    /// Fails with [`ConfigError::MissingConfig`] before the compiler is
    /// touched if the configuration file does not exist.
    pub fn compile(&self, root: impl AsRef<Path>) -> Result<(PathBuf, CompiledModule)> {
        let config_file = resolve_config_file(root);
        if !self.fs.is_file(&config_file) {
            return Err(ConfigError::MissingConfig { path: config_file });
        }

        debug!(file = %config_file.display(), "compiling configuration");
        let compiled = self.compiler.compile(&config_file)?;
        Ok((config_file, compiled))
    }

    /// Second half of [`Self::load`]: execute, validate and version-check.
    pub fn load_compiled(
        &self,
        config_file: &Path,
        compiled: &CompiledModule,
    ) -> Result<LoadedConfig> {
        let candidate = self.loader.load(compiled, config_file)?;
        let config = validate(candidate, config_file)?;

        let version_mismatch =
            check_version(&config.configuration.quartz_version, &self.tool_version);
        if let Some(mismatch) = &version_mismatch {
            warn!(
                declared = %mismatch.declared,
                running = %mismatch.running,
                "{mismatch}"
            );
        }

        info!(
            file = %config_file.display(),
            name = %config.configuration.name,
            plugins = config.plugins.len(),
            "configuration loaded"
        );

        Ok(LoadedConfig {
            config,
            version_mismatch,
        })
    }
}

/// Load the configuration of the project at `root` with the default
/// compiler and loader.
pub fn load_config(root: impl AsRef<Path>) -> Result<LoadedConfig> {
    ConfigPipeline::new().load(root)
}
