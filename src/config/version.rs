// src/config/version.rs

use std::fmt;

/// Version of the running tool.
pub const QUARTZ_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where the up-to-date configuration reference lives.
pub const SCHEMA_REFERENCE_URL: &str = "https://quartz.jzhao.xyz/configuration";

/// The configuration targets a different tool version. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    /// `configuration.quartzVersion` as written by the user.
    pub declared: String,
    /// Version of the running tool.
    pub running: String,
}

impl fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "configuration targets Quartz {} but this is Quartz {}; \
             see {} for the current configuration reference",
            self.declared, self.running, SCHEMA_REFERENCE_URL
        )
    }
}

/// Plain string comparison; no semver ranges.
pub fn check_version(declared: &str, running: &str) -> Option<VersionMismatch> {
    (declared != running).then(|| VersionMismatch {
        declared: declared.to_string(),
        running: running.to_string(),
    })
}
