// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchfolder`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchfolder",
    version,
    about = "Watch folders and run shell actions on changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Watchfolder.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Watchfolder.toml")]
    pub config: String,

    /// Write a commented sample config to the `--config` path and exit.
    ///
    /// Refuses to overwrite an existing file.
    #[arg(long)]
    pub init: bool,

    /// Parse + validate, print the resolved folders, but don't watch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHFOLDER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
