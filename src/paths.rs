// src/paths.rs

//! Canonical locations derived from a project root.
//!
//! These are pure path computations: nothing here touches the filesystem, so
//! symlinks are not followed. Paths are made absolute against the current
//! working directory and `.`/`..` components are folded lexically.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

/// Name of the configuration directory inside a project root.
pub const CONFIG_DIR_NAME: &str = "quartz";

/// Name of the configuration entry file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "quartz.config.js";

/// `{root}/quartz`, absolute and normalized.
pub fn resolve_config_dir(root: impl AsRef<Path>) -> PathBuf {
    normalize(&absolute(root.as_ref())).join(CONFIG_DIR_NAME)
}

/// `{root}/quartz/quartz.config.js`, absolute and normalized.
pub fn resolve_config_file(root: impl AsRef<Path>) -> PathBuf {
    resolve_config_dir(root).join(CONFIG_FILE_NAME)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    absolute_in(path, std::env::current_dir())
}

/// Join a relative `path` onto the working directory.
///
/// If the working directory cannot be read (deleted, no permission) the
/// filesystem root is used instead and a warning is logged.
fn absolute_in(path: &Path, cwd: io::Result<PathBuf>) -> PathBuf {
    let base = cwd.unwrap_or_else(|err| {
        warn!(path = %path.display(), "cannot read the working directory ({err}); resolving from /");
        PathBuf::from("/")
    });
    base.join(path)
}

/// Fold `.` and `..` components without consulting the filesystem.
///
/// `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
