//! CLI argument definitions for the launcher.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "app-launcher",
    version,
    about = "Prepare, update and launch the bundled application",
    long_about = "Prepare the per-user installation, check the release feed for a newer \
                  launcher and start the bundled application.\n\n\
                  Without a subcommand the full startup sequence runs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Installation root (default: per-user local data directory).
    #[arg(long = "root", value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file (default: <ROOT>/launcher.toml when present).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Prepare, check for updates, then launch (the default).
    Run(RunArgs),

    /// Extract the payload and provision the runtime, then stop.
    Prepare,

    /// Query the release feed and report whether an update is available.
    Check,

    /// Download and install the latest release if it differs from this one.
    Update,

    /// Launch the payload without preparing or checking.
    Launch,

    /// Show the installation state and the last update result.
    Status,
}

#[derive(Parser, Default)]
pub struct RunArgs {
    /// Install an available update without asking.
    #[arg(long = "yes", short = 'y', conflicts_with = "no_update")]
    pub yes: bool,

    /// Skip the update check.
    #[arg(long = "no-update")]
    pub no_update: bool,

    /// Stop after preparing and updating; do not start the payload.
    #[arg(long = "no-launch")]
    pub no_launch: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
