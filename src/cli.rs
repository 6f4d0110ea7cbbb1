// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `livewatch`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "livewatch",
    version,
    about = "Relaunch a command whenever watched files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Files, directories or glob patterns to watch.
    ///
    /// May be repeated or given as a comma-separated list.
    #[arg(short, long, value_name = "PATH", value_delimiter = ',', num_args = 1..)]
    pub patterns: Vec<String>,

    /// Paths (or glob patterns) to exclude from watching.
    ///
    /// Exclusions are exact path matches after expansion.
    #[arg(short, long, value_name = "PATH", value_delimiter = ',', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Shell command to run (through `sh -c`) on every change.
    #[arg(short, long, value_name = "CMD")]
    pub command: Option<String>,

    /// Also watch the current working directory.
    #[arg(short = 'w', long)]
    pub watch_cwd: bool,

    /// Do not descend into watched directories.
    #[arg(long)]
    pub no_recursive: bool,

    /// Do not apply the built-in exclusion list (`.git`, `node_modules`, ...).
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Minimum time between two relaunches, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Do not launch the command at startup; wait for the first change.
    #[arg(long)]
    pub no_initial_run: bool,

    /// Path to an optional config file (TOML).
    ///
    /// Default: `Livewatch.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Takes precedence over `--verbose` and `LIVEWATCH_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the watch list, but don't watch or run anything.
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
