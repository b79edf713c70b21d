//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// restwire: send one REST request through the retry and polling pipeline
///
/// Sends the request, retries failed attempts with exponential backoff,
/// follows long-running operations until they finish, and prints the
/// response body.
#[derive(Debug, Parser)]
#[command(name = "restwire")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Request URL (required unless set in the config file)
    pub url: Option<String>,

    /// HTTP method
    #[arg(long, short = 'X')]
    pub method: Option<String>,

    /// HTTP headers in 'Key=Value' or 'Key: Value' format (can be specified multiple times)
    #[arg(long = "header", short = 'H', value_name = "K=V")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Bearer token for Authorization header
    #[arg(long, conflicts_with = "token_file")]
    pub bearer: Option<String>,

    /// JSON token file whose access token authorizes the request
    #[arg(long = "token-file")]
    pub token_file: Option<PathBuf>,

    /// Accepted status code (can be specified multiple times)
    #[arg(long = "expect", value_name = "CODE")]
    pub expect: Vec<u16>,

    /// Maximum number of attempts
    #[arg(long = "retry-max")]
    pub retry_max: Option<u32>,

    /// Initial retry delay in seconds
    #[arg(long = "retry-delay")]
    pub retry_delay: Option<u64>,

    /// Poll long-running operations until they finish
    #[arg(long)]
    pub poll: bool,

    /// Seconds between polls when the service sends no Retry-After
    #[arg(long = "polling-delay")]
    pub polling_delay: Option<u64>,

    /// Total polling budget in seconds
    #[arg(long = "polling-duration")]
    pub polling_duration: Option<u64>,

    /// Client request id sent and echoed back by the service
    #[arg(long = "client-request-id")]
    pub client_request_id: Option<String>,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for restwire
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "restwire.toml")]
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
