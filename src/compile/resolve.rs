// src/compile/resolve.rs

//! Import specifier resolution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::fs::FileSystem;
use crate::paths::normalize;

/// Extensions tried, in order, when a specifier names a file without one.
pub const EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "js", "jsx", "mjs", "json"];

/// Host modules that only exist inside a full JavaScript runtime.
const HOST_BUILTINS: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "crypto",
    "events",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "process",
    "stream",
    "url",
    "util",
    "vm",
    "worker_threads",
    "zlib",
];

/// Resolve `specifier` as imported from the file `importer`.
pub fn resolve_specifier(fs: &dyn FileSystem, importer: &Path, specifier: &str) -> Result<PathBuf> {
    let base = importer.parent().unwrap_or_else(|| Path::new("/"));

    if is_host_builtin(specifier) {
        bail!("host module '{specifier}' is not available to configuration modules");
    }

    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        let candidate = normalize(&base.join(specifier));
        return resolve_path(fs, &candidate)
            .with_context(|| format!("cannot resolve '{specifier}'"));
    }

    resolve_package(fs, base, specifier)
}

fn is_host_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let head = specifier.split('/').next().unwrap_or(specifier);
    HOST_BUILTINS.contains(&head)
}

/// Try `path` as a file, then with each extension, then as a directory index.
fn resolve_path(fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
    if let Some(found) = try_file(fs, path) {
        return Ok(found);
    }
    if fs.is_dir(path) {
        if let Some(found) = try_file(fs, &path.join("index")) {
            return Ok(found);
        }
    }
    bail!("no file at {:?}", path)
}

fn try_file(fs: &dyn FileSystem, path: &Path) -> Option<PathBuf> {
    if fs.is_file(path) {
        return Some(path.to_path_buf());
    }
    EXTENSIONS.iter().find_map(|ext| {
        let mut name = OsString::from(path.as_os_str());
        name.push(".");
        name.push(ext);
        let candidate = PathBuf::from(name);
        fs.is_file(&candidate).then_some(candidate)
    })
}

/// Split `@scope/name/sub/path` or `name/sub/path` into package and subpath.
fn split_package(specifier: &str) -> (String, Option<String>) {
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next().unwrap_or_default();
    if first.starts_with('@') {
        let second = parts.next().unwrap_or_default();
        let rest = parts.next().map(str::to_string);
        (format!("{first}/{second}"), rest)
    } else {
        let rest: Vec<&str> = parts.collect();
        let rest = (!rest.is_empty()).then(|| rest.join("/"));
        (first.to_string(), rest)
    }
}

fn resolve_package(fs: &dyn FileSystem, base: &Path, specifier: &str) -> Result<PathBuf> {
    let (package, subpath) = split_package(specifier);

    for dir in base.ancestors() {
        let package_dir = dir.join("node_modules").join(&package);
        if !fs.is_dir(&package_dir) {
            continue;
        }
        if let Some(subpath) = &subpath {
            return resolve_path(fs, &package_dir.join(subpath))
                .with_context(|| format!("cannot resolve '{specifier}'"));
        }
        let entry = package_entry(fs, &package_dir)?;
        return resolve_path(fs, &package_dir.join(entry))
            .with_context(|| format!("cannot resolve entry of package '{package}'"));
    }

    bail!("package '{package}' not found in any node_modules directory above {:?}", base)
}

fn package_entry(fs: &dyn FileSystem, package_dir: &Path) -> Result<String> {
    let manifest_path = package_dir.join("package.json");
    if !fs.is_file(&manifest_path) {
        return Ok("index".to_string());
    }
    let manifest = fs.read_to_string(&manifest_path)?;
    let manifest: serde_json::Value = serde_json::from_str(&manifest)
        .with_context(|| format!("parsing {:?}", manifest_path))?;

    let entry = ["module", "main"]
        .iter()
        .find_map(|field| manifest.get(*field).and_then(|v| v.as_str()))
        .unwrap_or("index");
    Ok(entry.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/quartz/quartz.config.js", "");
        fs.add_file("/p/quartz/util.ts", "");
        fs.add_file("/p/quartz/util.js", "");
        fs.add_file("/p/quartz/layout/index.mjs", "");
        fs.add_file("/p/node_modules/@scope/pkg/package.json", r#"{ "module": "esm/entry.js" }"#);
        fs.add_file("/p/node_modules/@scope/pkg/esm/entry.js", "");
        fs.add_file("/p/node_modules/plain/index.js", "");
        fs.add_file("/p/node_modules/plain/extra/thing.json", "{}");
        fs
    }

    fn resolve(spec: &str) -> Result<PathBuf> {
        resolve_specifier(&project(), Path::new("/p/quartz/quartz.config.js"), spec)
    }

    #[test]
    fn relative_specifiers_try_extensions_in_order() {
        assert_eq!(resolve("./util").unwrap(), Path::new("/p/quartz/util.ts"));
        assert_eq!(resolve("./util.js").unwrap(), Path::new("/p/quartz/util.js"));
        assert_eq!(resolve("./layout").unwrap(), Path::new("/p/quartz/layout/index.mjs"));
        assert_eq!(resolve("../quartz/./util.js").unwrap(), Path::new("/p/quartz/util.js"));
    }

    #[test]
    fn bare_specifiers_search_node_modules_upwards() {
        assert_eq!(
            resolve("@scope/pkg").unwrap(),
            Path::new("/p/node_modules/@scope/pkg/esm/entry.js")
        );
        assert_eq!(resolve("plain").unwrap(), Path::new("/p/node_modules/plain/index.js"));
        assert_eq!(
            resolve("plain/extra/thing").unwrap(),
            Path::new("/p/node_modules/plain/extra/thing.json")
        );
    }

    #[test]
    fn unresolvable_specifiers_fail() {
        assert!(resolve("./missing").is_err());
        assert!(resolve("not-installed").is_err());
        assert!(resolve("node:path").is_err());
        assert!(resolve("fs/promises").is_err());
    }
}
