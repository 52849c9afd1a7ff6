// src/errors.rs

//! Crate-wide error type and helpers.
//!
//! Every pipeline stage returns one of these variants instead of exiting, so
//! callers can pick their own recovery UX per kind.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {}", path.display())]
    MissingConfig { path: PathBuf },

    #[error("Failed to compile {}: {diagnostic}", path.display())]
    Compile { path: PathBuf, diagnostic: String },

    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Configuration is missing required key `{key}`")]
    MissingKey { key: String },

    #[error("Configuration is missing required component `components.{key}`")]
    MissingComponent { key: String },

    #[error("Configuration failed schema validation: {message}")]
    SchemaValidation { message: String },

    #[error("Failed to scaffold {}: {reason}", path.display())]
    ScaffoldCopy { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Seed file parsing error: {0}")]
    SeedParse(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConfigError {
    pub fn compile(path: impl Into<PathBuf>, diagnostic: impl Into<String>) -> Self {
        ConfigError::Compile {
            path: path.into(),
            diagnostic: diagnostic.into(),
        }
    }

    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn scaffold(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ConfigError::ScaffoldCopy {
            path: path.into(),
            reason: format!("{reason:#}"),
        }
    }

    /// Short suggestion shown after the diagnostic.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConfigError::MissingConfig { .. } => {
                Some("run `quartz init` to create a configuration first")
            }
            ConfigError::Compile { .. } => {
                Some("check quartz.config.js and its imports for syntax errors or typos")
            }
            ConfigError::Load { .. } => {
                Some("quartz.config.js threw while running; fix the error above")
            }
            ConfigError::MissingKey { .. }
            | ConfigError::MissingComponent { .. }
            | ConfigError::SchemaValidation { .. } => {
                Some("fix the reported field in quartz.config.js and run again")
            }
            ConfigError::ScaffoldCopy { .. } => {
                Some("make sure the template exists and the target directory is writable")
            }
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConfigError>;
