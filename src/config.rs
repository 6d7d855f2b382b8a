//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tpaudit.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tpaudit.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// CPU throttling settings.
    #[serde(default)]
    pub throttling: ThrottlingConfig,

    /// Entity database settings.
    #[serde(default)]
    pub entities: EntitiesConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "tpaudit_report.md".to_string()
}

/// How the trace was throttled when it was recorded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ThrottlingMethod {
    /// Throttling was simulated after an unthrottled load
    #[default]
    Simulate,
    /// Throttling was applied by the browser during the load
    Devtools,
    /// No throttling; the environment is used as provided
    Provided,
}

/// CPU throttling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottlingConfig {
    /// Throttling method used for the recorded load.
    #[serde(default)]
    pub method: ThrottlingMethod,

    /// CPU slowdown factor applied by simulated throttling.
    #[serde(default = "default_cpu_slowdown")]
    pub cpu_slowdown_multiplier: f64,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            method: ThrottlingMethod::default(),
            cpu_slowdown_multiplier: default_cpu_slowdown(),
        }
    }
}

fn default_cpu_slowdown() -> f64 {
    4.0
}

impl ThrottlingConfig {
    /// Factor applied to main-thread task time.
    ///
    /// Only simulated throttling leaves task times at unthrottled speed, so
    /// only then are they scaled up by the slowdown factor.
    pub fn cpu_multiplier(&self) -> f64 {
        match self.method {
            ThrottlingMethod::Simulate => self.cpu_slowdown_multiplier,
            ThrottlingMethod::Devtools | ThrottlingMethod::Provided => 1.0,
        }
    }
}

/// Entity database settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitiesConfig {
    /// JSON entity database to use instead of the built-in one.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Include the grand totals section.
    #[serde(default = "default_true")]
    pub include_summary: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            include_summary: true,
        }
    }
}

fn default_title() -> String {
    "Third-Party Usage".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_if_exists(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load `path` if it exists. A file that exists but is malformed is an error.
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(method) = args.throttling_method {
            self.throttling.method = method;
        }
        if let Some(multiplier) = args.cpu_slowdown {
            self.throttling.cpu_slowdown_multiplier = multiplier;
        }

        if let Some(ref database) = args.entities {
            self.entities.database = Some(database.clone());
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let multiplier = self.throttling.cpu_slowdown_multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            anyhow::bail!(
                "cpu_slowdown_multiplier must be a positive number, got {}",
                multiplier
            );
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
