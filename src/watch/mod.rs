// src/watch/mod.rs

//! Watch mode.
//!
//! This module is responsible for:
//! - Matching changed paths against `ignorePatterns` (`globset`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Skipping reloads when the recompiled bundle's digest did not change.

pub mod ignore;
pub mod reload;
pub mod watcher;

pub use ignore::IgnoreMatcher;
pub use reload::{ConfigWatch, ReloadOutcome};
pub use watcher::run_watch;
