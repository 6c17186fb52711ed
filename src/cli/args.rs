//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and the `traces` argument groups.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_ENV;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Examples:
  $ xray-traces traces --ti 1-5f84c7a1-2b8c1d0e9f3a4b5c6d7e8f90
  $ xray-traces traces -s \"30m ago\" -e now
  $ xray-traces traces --tail -u | jq .Id
  $ xray-traces --config-env prod traces -s 2024-01-01T00:00:00";

/// AWS X-Ray traces from the command line
#[derive(Parser, Debug)]
#[command(
    name = "xray-traces",
    version = env!("CARGO_PKG_VERSION"),
    about = "Fetch, print and tail AWS X-Ray traces",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings environment to layer over [default]
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_ENV, env = "XRAY_TRACES_CONFIG_ENV")]
    pub config_env: String,

    /// AWS region (overrides config)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// AWS named profile (overrides config)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Show detailed loading information
    #[arg(long, global = true)]
    pub info: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch traces by id, by time range, or continuously
    #[command(about = "Fetch and print X-Ray traces and service graphs")]
    Traces(TracesArgs),

    /// Initialize project
    #[command(about = "Create .xray-traces/settings.toml with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TracesArgs {
    /// Trace id to fetch; may be repeated. Takes precedence over --tail and time options
    #[arg(long = "trace-id", visible_alias = "ti", value_name = "ID")]
    pub trace_ids: Vec<String>,

    #[command(flatten)]
    pub observability: ObservabilityArgs,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservabilityArgs {
    /// Start of the window: absolute (2024-01-01T10:00:00), epoch seconds, or relative ("15m ago")
    #[arg(short, long, value_name = "TIME")]
    pub start_time: Option<String>,

    /// End of the window, same formats as --start-time [default: now]
    #[arg(short, long, value_name = "TIME")]
    pub end_time: Option<String>,

    /// Keep polling for new traces until interrupted
    #[arg(short, long)]
    pub tail: bool,

    /// Print raw JSON, one document per line
    #[arg(short, long)]
    pub unformatted: bool,
}
