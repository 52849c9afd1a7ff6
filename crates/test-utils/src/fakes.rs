use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quartz_config::compile::{CompiledModule, ModuleCompiler};
use quartz_config::errors::Result;
use quartz_config::load::{Candidate, ModuleLoader};

/// A compiler that never touches the filesystem:
/// - counts how often it was asked to compile
/// - always returns the same module text.
#[derive(Debug, Clone)]
pub struct CountingCompiler {
    calls: Arc<AtomicUsize>,
    output: String,
}

impl CountingCompiler {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            output: output.into(),
        }
    }

    /// Shared handle to the call counter, usable after the compiler has been
    /// moved into a pipeline.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ModuleCompiler for CountingCompiler {
    fn compile(&self, _entry: &Path) -> Result<CompiledModule> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompiledModule::new(self.output.clone()))
    }
}

/// A loader that ignores the module text and returns a fixed candidate.
#[derive(Debug, Clone)]
pub struct CountingLoader {
    calls: Arc<AtomicUsize>,
    candidate: Candidate,
}

impl CountingLoader {
    pub fn new(candidate: Candidate) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            candidate,
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ModuleLoader for CountingLoader {
    fn load(&self, _module: &CompiledModule, _identity: &Path) -> Result<Candidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidate.clone())
    }
}
