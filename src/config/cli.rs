//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// calendar-queue: rate-limit-aware request queue for a calendar API
///
/// Accepts arbitrary HTTP requests, stores them on a queue and replays
/// them against the calendar API one at a time with adaptive pacing.
#[derive(Debug, Parser)]
#[command(name = "calendar-queue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Root URL of the calendar API (required for run mode)
    #[arg(long = "calendar-url", value_name = "URL")]
    pub calendar_url: Option<String>,

    /// Work queue name (required for run mode)
    #[arg(long)]
    pub queue: Option<String>,

    /// Error queue name (required for run mode)
    #[arg(long = "error-queue")]
    pub error_queue: Option<String>,

    /// Broker address, e.g. redis://127.0.0.1:6379 or memory:// (can be specified multiple times)
    #[arg(long = "broker", value_name = "URL")]
    pub brokers: Vec<String>,

    /// Address the ingress server listens on
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Address of the health endpoint (disabled unless set)
    #[arg(long = "health-listen", value_name = "ADDR")]
    pub health_listen: Option<String>,

    /// Use the base pacing delay regardless of rate limiting
    #[arg(long = "no-adaptive-pacing")]
    pub no_adaptive_pacing: bool,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for calendar-queue
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "calendar-queue.toml")]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}
