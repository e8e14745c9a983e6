//! Command-line argument parsing for ranq.

use crate::config::Config;
use crate::error::{QueryError, Result};
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Run queries against the telemetry data lake.
#[derive(Parser, Debug)]
#[command(name = "ranq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Query service endpoint URL
    #[arg(long, value_name = "URL", global = true)]
    pub endpoint: Option<String>,

    /// Query service region
    #[arg(long, value_name = "REGION", global = true)]
    pub region: Option<String>,

    /// Dataset queries run in
    #[arg(short = 'd', long, value_name = "DATABASE", global = true)]
    pub database: Option<String>,

    /// Output location for spooled results (e.g., s3://bucket/results/)
    #[arg(short = 'o', long, value_name = "URI", global = true)]
    pub output_location: Option<String>,

    /// Delay between state checks, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Number of state checks before giving up
    #[arg(long, value_name = "N", global = true)]
    pub max_attempts: Option<u32>,

    /// Use a scripted in-memory query service (for testing)
    #[arg(long, global = true)]
    pub mock: bool,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a statement and print its results
    Run(RunArgs),

    /// Create the dataset and the configured external tables
    Setup,

    /// Print the current state of a submitted query
    Status {
        /// Query handle returned at submission
        handle: String,
    },

    /// Wait for a submitted query and print its results
    Fetch {
        /// Query handle returned at submission
        handle: String,

        /// Output format: table, json, or csv
        #[arg(long, value_name = "FORMAT", default_value = "table")]
        format: String,
    },

    /// Ask the service to stop a running query
    Cancel {
        /// Query handle returned at submission
        handle: String,
    },
}

/// Arguments for `ranq run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Statement text
    #[arg(value_name = "STATEMENT", conflicts_with = "file")]
    pub statement: Option<String>,

    /// Read the statement from a file
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Output format: table, json, or csv
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub format: String,

    /// Fetch results even if the statement looks like a definition
    #[arg(long, conflicts_with = "no_fetch")]
    pub fetch: bool,

    /// Only wait for completion; do not fetch results
    #[arg(long)]
    pub no_fetch: bool,

    /// Submit without a dataset context (for namespace statements)
    #[arg(long)]
    pub no_database: bool,
}

impl RunArgs {
    /// Returns the statement text from the argument or the file.
    pub fn statement_text(&self) -> Result<String> {
        let text = match (&self.statement, &self.file) {
            (Some(statement), _) => statement.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                QueryError::invalid_request(format!(
                    "Failed to read {}: {e}",
                    path.display()
                ))
            })?,
            (None, None) => {
                return Err(QueryError::invalid_request(
                    "a statement or --file is required",
                ))
            }
        };

        if text.trim().is_empty() {
            return Err(QueryError::invalid_request("statement must not be empty"));
        }
        Ok(text)
    }

    /// Parses the output format from the --format argument.
    pub fn output_format(&self) -> Result<OutputFormat> {
        parse_format(&self.format)
    }

    /// Returns the explicit fetch decision, if any.
    pub fn fetch_override(&self) -> Option<bool> {
        if self.fetch {
            Some(true)
        } else if self.no_fetch {
            Some(false)
        } else {
            None
        }
    }
}

/// Parses an output format argument.
pub fn parse_format(format: &str) -> Result<OutputFormat> {
    format.parse().map_err(QueryError::invalid_request)
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.service.endpoint = Some(endpoint.clone());
        }
        if let Some(region) = &self.region {
            config.service.region = Some(region.clone());
        }
        if let Some(database) = &self.database {
            config.query.database = Some(database.clone());
        }
        if let Some(location) = &self.output_location {
            config.query.output_location = Some(location.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            config.query.poll_interval_ms = ms;
        }
        if let Some(attempts) = self.max_attempts {
            config.query.max_attempts = attempts;
        }
    }
}
