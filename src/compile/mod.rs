// src/compile/mod.rs

//! Module compiler.
//!
//! Turns the configuration entry file and everything it imports into one
//! self-contained script, entirely in memory:
//! - `resolve.rs` maps import specifiers to files.
//! - `lexer.rs` tokenizes module sources; `rewrite.rs` edits token streams
//!   without moving line breaks.
//! - `jsx.rs`, `typescript.rs` and `modules.rs` are the per-module stages,
//!   chained by `transform.rs`.
//! - `bundler.rs` walks the module graph and emits the bundle.

pub mod bundler;
pub mod jsx;
pub mod lexer;
pub mod modules;
pub mod resolve;
pub mod rewrite;
pub mod transform;
pub mod typescript;

use std::path::Path;

use crate::errors::Result;

pub use bundler::Bundler;
pub use jsx::JsxOptions;

/// Output of a compilation: the bundled script text.
///
/// Evaluating `text` as a classic script yields the entry module's export
/// namespace as its completion value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    text: String,
}

impl CompiledModule {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Hex `blake3` digest of the bundle text.
    pub fn digest(&self) -> String {
        blake3::hash(self.text.as_bytes()).to_hex().to_string()
    }
}

/// Anything that can turn an entry file into a [`CompiledModule`].
pub trait ModuleCompiler {
    /// `entry` must be an absolute path to an existing file.
    fn compile(&self, entry: &Path) -> Result<CompiledModule>;
}

impl<C: ModuleCompiler + ?Sized> ModuleCompiler for &C {
    fn compile(&self, entry: &Path) -> Result<CompiledModule> {
        (**self).compile(entry)
    }
}
