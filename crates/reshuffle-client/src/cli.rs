//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// reshuffle - Move your meetings off blocked days
#[derive(Debug, Parser)]
#[command(name = "reshuffle")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "RESHUFFLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Arguments of a rescheduling run.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Blocked dates, comma-separated YYYY-MM-DD
    #[arg(required = true)]
    pub blocked_dates: Option<String>,

    /// Candidate dates, comma-separated YYYY-MM-DD, in preference order
    #[arg(required = true)]
    pub candidate_dates: Option<String>,

    /// Daily window start, HH:MM
    #[arg(required = true)]
    pub start_time: Option<String>,

    /// Daily window end, HH:MM
    #[arg(required = true)]
    pub end_time: Option<String>,

    /// Compute the plan without changing the calendar
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Print the plan as JSON after the transcript
    #[arg(long)]
    pub json: bool,

    /// Read the calendar from a JSON snapshot instead of Google
    #[arg(long, value_name = "FILE")]
    pub offline: Option<PathBuf>,

    /// Calendar to operate on (overrides config)
    #[arg(long)]
    pub calendar_id: Option<String>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
