// src/lib.rs

//! Configuration subsystem of the Quartz static-site generator.
//!
//! The core is the pipeline in [`config::ConfigPipeline`]:
//! [`paths`] locates `quartz/quartz.config.js`, [`compile`] bundles it and its
//! imports, [`load`] executes the bundle in a fresh engine context, and
//! [`config::validate`] gates the result on the structural contract.
//! [`scaffold`] creates a new configuration directory from a template.

pub mod cli;
pub mod compile;
pub mod config;
pub mod errors;
pub mod fs;
pub mod load;
pub mod logging;
pub mod paths;
pub mod scaffold;
pub mod watch;

use std::path::Path;

use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::compile::{Bundler, JsxOptions};
use crate::config::{ConfigPipeline, LoadedConfig, QUARTZ_VERSION};
use crate::errors::Result;
use crate::load::JsModuleLoader;
use crate::scaffold::{default_template_dir, PlaceholderMode, Scaffolder, SeedConfig};
use crate::watch::{run_watch, ConfigWatch, ReloadOutcome};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Init {
            name,
            template,
            seed,
            first_only,
        } => {
            let mut seed_config = SeedConfig::new(QUARTZ_VERSION, name);
            if let Some(seed_file) = seed {
                let text = std::fs::read_to_string(&seed_file)?;
                seed_config = seed_config.extend_from_toml(&text)?;
            }
            let mode = if first_only {
                PlaceholderMode::First
            } else {
                PlaceholderMode::All
            };
            let template = template.unwrap_or_else(default_template_dir);
            let config_file = Scaffolder::new(template)
                .placeholder_mode(mode)
                .scaffold(&args.directory, &seed_config)?;
            println!("created {}", config_file.display());
            Ok(())
        }
        Command::Check {
            watch,
            jsx_factory,
            jsx_fragment,
        } => {
            let jsx = JsxOptions {
                factory: jsx_factory,
                fragment: jsx_fragment,
            };
            let pipeline = ConfigPipeline::with_parts(Bundler::new().jsx(jsx), JsModuleLoader::new());
            if watch {
                return check_and_watch(pipeline, &args.directory).await;
            }
            let loaded = pipeline.load(&args.directory)?;
            print_summary(&loaded);
            Ok(())
        }
    }
}

async fn check_and_watch(pipeline: ConfigPipeline, directory: &Path) -> Result<()> {
    let root = directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf());
    let mut watch = ConfigWatch::new(pipeline, root)?;

    // The first load must succeed; later failures keep the last good config.
    match watch.reload() {
        ReloadOutcome::Reloaded(loaded) => print_summary(&loaded),
        ReloadOutcome::Failed(err) => return Err(err),
        ReloadOutcome::Unchanged => {}
    }

    run_watch(watch, print_summary).await?;
    Ok(())
}

/// Print a short human-readable summary of a validated configuration.
fn print_summary(loaded: &LoadedConfig) {
    let config = &loaded.config;
    println!("quartz configuration: {}", config.source.display());
    println!("  name = {}", config.configuration.name);
    println!("  quartzVersion = {}", config.configuration.quartz_version);
    if !config.configuration.ignore_patterns.is_empty() {
        println!("  ignorePatterns = {:?}", config.configuration.ignore_patterns);
    }
    for key in config.configuration.extra.keys() {
        println!("  {key} = {}", config.configuration.extra[key]);
    }
    println!();

    println!("plugins ({}):", config.plugins.len());
    for plugin in &config.plugins {
        println!("  - {}", plugin.name().unwrap_or("<anonymous>"));
    }

    println!("components:");
    for (key, component) in config.components.iter() {
        println!("  {key}: {}", component.name().unwrap_or("<anonymous>"));
    }

    if let Some(mismatch) = &loaded.version_mismatch {
        println!();
        println!("warning: {mismatch}");
    }

    debug!("summary printed");
}
