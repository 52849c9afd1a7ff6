// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the validated data model (`model.rs`).
//! - Declare the `configuration` schema (`schema.rs`).
//! - Gate loaded candidates on the structural contract (`validate.rs`).
//! - Compare the declared tool version with the running one (`version.rs`).
//! - Drive compile -> load -> validate for a project root (`loader.rs`).

pub mod loader;
pub mod model;
pub mod schema;
pub mod validate;
pub mod version;

pub use loader::{load_config, ConfigPipeline, LoadedConfig};
pub use model::{ComponentSlots, PluginDescriptor, SiteConfiguration, ValidatedConfig};
pub use validate::validate;
pub use version::{check_version, VersionMismatch, QUARTZ_VERSION, SCHEMA_REFERENCE_URL};
