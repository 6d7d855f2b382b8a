//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ThrottlingMethod;
use clap::Parser;
use std::path::PathBuf;

/// tpaudit - third-party impact summary for page loads
///
/// Attributes network bytes and main-thread time from a page load to the
/// third-party providers responsible for them, and ranks the providers by
/// combined impact. Markdown/JSON reports.
///
/// Examples:
///   tpaudit --network network.json --tasks tasks.json
///   tpaudit --network network.json --tasks tasks.json --throttling-method devtools
///   tpaudit --network network.json --tasks tasks.json --format json -o report.json
///   tpaudit --network network.json --tasks tasks.json --fail-on-blocking 250
///   tpaudit --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON array of network transfer records
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub network: Option<PathBuf>,

    /// JSON array of main-thread tasks
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub tasks: Option<PathBuf>,

    /// Entity database (JSON) to use instead of the built-in one
    #[arg(short, long, value_name = "FILE", env = "TPAUDIT_ENTITIES")]
    pub entities: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Default: from config or tpaudit_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tpaudit.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Throttling method the trace was recorded with
    #[arg(long, value_name = "METHOD")]
    pub throttling_method: Option<ThrottlingMethod>,

    /// CPU slowdown multiplier used by simulated throttling
    #[arg(long, value_name = "FACTOR")]
    pub cpu_slowdown: Option<f64>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Fail if third-party main-thread time reaches this many milliseconds
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is reached.
    #[arg(long, value_name = "MS")]
    pub fail_on_blocking: Option<f64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .tpaudit.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        for (flag, path) in [("--network", &self.network), ("--tasks", &self.tasks)] {
            match path {
                None => return Err(format!("{} is required", flag)),
                Some(path) if !path.is_file() => {
                    return Err(format!("{} file does not exist: {}", flag, path.display()))
                }
                Some(_) => {}
            }
        }

        if let Some(slowdown) = self.cpu_slowdown {
            if !slowdown.is_finite() || slowdown <= 0.0 {
                return Err("CPU slowdown must be a positive number".to_string());
            }
        }

        if let Some(threshold) = self.fail_on_blocking {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err("--fail-on-blocking must be a non-negative number".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
