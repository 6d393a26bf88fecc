// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build, watch and serve a front-end project through a task graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Task or entry to run (`styles`, `html`, `build`, `serve`, `serve:dist`,
    /// `serve:test`, `default`, ...).
    #[arg(value_name = "TASK", default_value = "default")]
    pub task: String,

    /// Project root; every configured path is relative to it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Pipeline.toml` in the project root. A missing file means
    /// the stock layout.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build for production even when the entry would not.
    #[arg(long)]
    pub production: bool,

    /// Parse + validate, print the task graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
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
    fn task_defaults_to_the_default_entry() {
        let args = CliArgs::parse_from(["assetdag"]);
        assert_eq!(args.task, "default");
        assert_eq!(args.root, ".");
        assert!(!args.production);
    }

    #[test]
    fn flags_are_parsed() {
        let args = CliArgs::parse_from([
            "assetdag",
            "serve:dist",
            "--root",
            "site",
            "--log-level",
            "debug",
            "--dry-run",
        ]);
        assert_eq!(args.task, "serve:dist");
        assert_eq!(args.root, "site");
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
