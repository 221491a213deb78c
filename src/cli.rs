// src/cli.rs

//! CLI argument parsing using `clap` (derive feature).

use clap::{Parser, ValueEnum};

/// Command-line arguments for `procmux`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procmux",
    version,
    about = "Launch and supervise a set of processes from a config file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Procmux.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Procmux.toml")]
    pub config: String,

    /// Launch only the named processes (repeatable).
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCMUX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the processes, but don't launch anything.
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
