// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `quartz`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "quartz",
    version,
    about = "Scaffold, load and validate Quartz site configuration.",
    long_about = None
)]
pub struct CliArgs {
    /// Project root containing (or receiving) the `quartz/` directory.
    #[arg(short, long, value_name = "PATH", default_value = ".", global = true)]
    pub directory: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `QUARTZ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create `quartz/` from the template and fill in the site details.
    Init {
        /// Site name substituted for `{{name}}`.
        #[arg(long)]
        name: String,

        /// Template directory to copy.
        ///
        /// Default: `QUARTZ_TEMPLATE_DIR`, or the template shipped with quartz.
        #[arg(long, value_name = "DIR")]
        template: Option<PathBuf>,

        /// TOML file with extra `key = value` placeholders.
        #[arg(long, value_name = "FILE")]
        seed: Option<PathBuf>,

        /// Replace only the first occurrence of each placeholder.
        #[arg(long)]
        first_only: bool,
    },

    /// Compile, load and validate `quartz/quartz.config.js`.
    Check {
        /// Keep running and revalidate whenever the project changes.
        #[arg(long)]
        watch: bool,

        /// Function JSX elements compile to, unless a file sets `@jsx`.
        #[arg(long, value_name = "NAME", default_value = "h")]
        jsx_factory: String,

        /// Name JSX fragments compile to, unless a file sets `@jsxFrag`.
        #[arg(long, value_name = "NAME", default_value = "Fragment")]
        jsx_fragment: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_takes_jsx_names() {
        let args = CliArgs::try_parse_from(["quartz", "check", "--jsx-factory", "jsx", "--jsx-fragment", "Frag"]).unwrap();
        match args.command {
            Command::Check { jsx_factory, jsx_fragment, watch } => {
                assert_eq!((jsx_factory.as_str(), jsx_fragment.as_str(), watch), ("jsx", "Frag", false));
            }
            other => panic!("expected Check, got {other:?}"),
        }

        let args = CliArgs::try_parse_from(["quartz", "check"]).unwrap();
        assert!(matches!(args.command, Command::Check { jsx_factory, .. } if jsx_factory == "h"));
    }
}
