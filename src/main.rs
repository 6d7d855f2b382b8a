//! tpaudit - third-party impact summary
//!
//! A CLI tool that attributes page-load cost from pre-extracted network
//! records and main-thread tasks to third-party providers and writes a
//! ranked report.
//!
//! Exit codes:
//!   0 - Success (threshold not reached, or no --fail-on-blocking set)
//!   1 - Runtime error (missing input, bad config, unreadable database, etc.)
//!   2 - Third-party main-thread time at or above --fail-on-blocking

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tpaudit::cli::{Args, OutputFormat};
use tpaudit::config::{Config, DEFAULT_CONFIG_FILE};
use tpaudit::entities::EntityDatabase;
use tpaudit::models::{Report, ReportMetadata};
use tpaudit::{loader, report, third_party_summary};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging starts so `[general] verbose` can set the level
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose))?;

    info!("tpaudit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run_audit(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Audit failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tpaudit.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize throttling, the entity database, and the report.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the complete audit workflow. Returns exit code (0 or 2).
async fn run_audit(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.validate()?;

    let network_path = args.network.as_deref().context("--network is required")?;
    let tasks_path = args.tasks.as_deref().context("--tasks is required")?;

    // Step 1: Load the entity knowledge base
    let database = match config.entities.database {
        Some(ref path) => EntityDatabase::load(path)?,
        None => {
            let db = EntityDatabase::embedded().context("Built-in entity database is invalid")?;
            debug!(entities = db.len(), "Using built-in entity database");
            db
        }
    };

    // Step 2: Load the trace artifacts
    let inputs = loader::load_inputs(network_path, tasks_path).await?;

    // Step 3: Attribute, rank and assemble
    let cpu_multiplier = config.throttling.cpu_multiplier();
    info!(
        method = ?config.throttling.method,
        cpu_multiplier,
        "Attributing third-party cost"
    );
    let audit = third_party_summary(&inputs.records, &inputs.tasks, cpu_multiplier, &database);

    let summary = audit.details.summary;
    let third_parties = audit.details.items.len();

    let report = Report {
        title: config.report.title.clone(),
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            network_file: network_path.display().to_string(),
            tasks_file: tasks_path.display().to_string(),
            records_analyzed: inputs.records.len(),
            tasks_analyzed: inputs.tasks.len(),
            cpu_multiplier,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        audit,
    };

    // Step 4: Generate and save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, config.report.include_summary)
        }
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if !args.quiet {
        println!("\n📊 Third-Party Summary:");
        println!("   Third parties: {}", third_parties);
        println!("   Transfer size: {} bytes", summary.wasted_bytes);
        println!("   Main-thread time: {:.0} ms", summary.wasted_ms);
        println!("\n✅ Report saved to: {}", output_path.display());
    }

    // Check --fail-on-blocking threshold
    if let Some(threshold) = args.fail_on_blocking {
        if summary.wasted_ms >= threshold {
            eprintln!(
                "\n⛔ Third-party code blocked the main thread for {:.0} ms (threshold {} ms). Failing (exit code 2).",
                summary.wasted_ms, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so the file it came from is returned for
/// the caller to log. A default config file that exists but fails to parse
/// is an error, same as an explicit `--config`.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(DEFAULT_CONFIG_FILE)))),
        None => Ok((Config::default(), None)),
    }
}
