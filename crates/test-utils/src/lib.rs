//! Shared helpers for the `quartz-config` integration tests.
//!
//! - [`builders::CandidateBuilder`] produces loaded candidates without running
//!   any JavaScript.
//! - [`fakes`] holds compiler/loader stand-ins that count their calls.

pub mod builders;
pub mod fakes;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Default filter: pipeline progress plus anything configuration modules
/// print through `console`.
const DEFAULT_FILTER: &str = "info,quartz::config=debug";

/// Initialise tracing for tests.
///
/// Logs go through `with_test_writer()`, so the harness only shows them for
/// failing tests (or with `-- --nocapture`). Override the filter with e.g.
/// `RUST_LOG=quartz_config=trace cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}
