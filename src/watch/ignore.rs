// src/watch/ignore.rs

use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Always skipped, whatever the configuration says.
pub const ALWAYS_IGNORED: &[&str] = &[".git", "node_modules"];

/// Matches project-relative paths against `ignorePatterns`.
///
/// A pattern matches the path itself and everything below it, so `private`
/// ignores `private/notes.md` as well.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    set: GlobSet,
}

impl IgnoreMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let all = ALWAYS_IGNORED
            .iter()
            .copied()
            .chain(patterns.iter().map(AsRef::as_ref));
        for pattern in all {
            let pattern = pattern.trim_end_matches('/');
            for expanded in [pattern.to_string(), format!("{pattern}/**")] {
                let glob = Glob::new(&expanded)
                    .with_context(|| format!("invalid ignore pattern '{pattern}'"))?;
                builder.add(glob);
            }
        }
        let set = builder.build().context("building ignore pattern set")?;
        Ok(Self { set })
    }

    /// `relative` uses forward slashes and no leading `./`.
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Falls back to canonicalized paths when the direct prefix strip fails
/// (symlinked temp dirs on macOS, for instance). Returns `None` if the path
/// is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}
