//! StoryTracker - sprint story tracker with on-time-delivery reporting
//!
//! A CLI tool that keeps work items in a CSV table, derives spillover
//! from completion and sprint end dates, and reports delivery statistics.
//!
//! Exit codes:
//!   0 - Success (OTD at or above threshold, or no --fail-below set)
//!   1 - Runtime error (missing table, malformed file, bad row, etc.)
//!   2 - OTD % below the --fail-below threshold

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod schema;
mod store;

use anyhow::{Context, Result};
use cli::{Args, Command, ItemFields, OtdArgs, OutputFormat};
use config::{Config, CONFIG_FILE};
use error::TrackerError;
use std::path::{Path, PathBuf};
use store::Table;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // A broken config is fatal: writes would reformat every date
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    debug!("StoryTracker v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Config: {:?}", config);

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .storytracker.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the table file, date format and grouping.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one subcommand. Returns the exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let classifier = config.classifier();
    let date_format = classifier.date_format().to_string();
    let path = PathBuf::from(&config.general.data_file);

    match args.command {
        Command::List { sprint } => {
            let table = open_table(&path, &config)?;
            let rows: Vec<_> = analysis::select_rows(table.items(), sprint.as_deref()).collect();

            if rows.is_empty() {
                println!("No items.");
            } else {
                print!("{}", report::generate_items_table(rows, &date_format));
                println!(
                    "\n{}",
                    report::generate_status_line(table.items(), sprint.as_deref())
                );
            }
            Ok(0)
        }

        Command::Sprints => {
            let table = open_table(&path, &config)?;
            if table.is_empty() {
                println!("No items.");
            }
            for key in analysis::group_keys(table.items()) {
                println!("{}", key);
            }
            Ok(0)
        }

        Command::Otd(otd) => run_otd(&path, &config, otd),

        Command::Timeline { sprint, width } => {
            let table = open_table(&path, &config)?;
            let timeline = report::build_timeline(table.items(), sprint.as_deref());
            let width = width.unwrap_or(config.report.timeline_width);

            print!("{}", report::render_timeline(&timeline, width, &date_format));
            Ok(0)
        }

        Command::Add(fields) => {
            let table = match store::read_table(&path, &classifier) {
                Ok(table) => table,
                Err(TrackerError::TableNotFound(_)) => {
                    info!("Starting a new table at {}", path.display());
                    Table::new()
                }
                Err(e) => return Err(e.into()),
            };

            warn_if_unnamed(&fields);
            let table = table.with_added(&fields.to_new_record(), &classifier);
            save(&table, &path, &date_format)?;

            let row = table.len() - 1;
            let item = &table.items()[row];
            println!(
                "✅ Added row {}: {} (spillover: {})",
                row,
                item.label(),
                item.spillover()
            );
            Ok(0)
        }

        Command::Edit { row, fields } => {
            let table = open_table(&path, &config)?;
            let table = table
                .with_edited(row, &fields.to_record(), &classifier)
                .with_context(|| format!("Failed to edit row {}", row))?;
            save(&table, &path, &date_format)?;

            let item = &table.items()[row];
            println!(
                "✅ Updated row {}: {} (spillover: {})",
                row,
                item.label(),
                item.spillover()
            );
            Ok(0)
        }

        Command::Delete { row } => {
            let table = open_table(&path, &config)?;
            let label = table
                .items()
                .get(row)
                .map(|item| item.label().to_string())
                .unwrap_or_default();
            let table = table
                .without_row(row)
                .with_context(|| format!("Failed to delete row {}", row))?;
            save(&table, &path, &date_format)?;

            println!("✅ Deleted row {}: {}", row, label);
            Ok(0)
        }

        Command::Export { output } => {
            let table = open_table(&path, &config)?;
            report::export_xlsx(&table, &output, &date_format)
                .with_context(|| format!("Failed to export to {}", output.display()))?;

            println!("✅ Exported {} rows to {}", table.len(), output.display());
            Ok(0)
        }

        Command::InitConfig => unreachable!("init-config is handled before logging starts"),
    }
}

/// Build, print or save the OTD report and apply --fail-below.
fn run_otd(path: &Path, config: &Config, otd: OtdArgs) -> Result<i32> {
    let table = open_table(path, config)?;
    let sprint = otd.sprint.as_deref();

    if let Some(key) = sprint {
        if !analysis::group_keys(table.items()).iter().any(|k| k == key) {
            warn!("No items in sprint '{}'", key);
        }
    }

    let report = report::OtdReport::build(
        path.display().to_string(),
        table.items(),
        sprint,
        otd.items || config.report.include_items,
    );

    let output = match otd.format.unwrap_or(config.report.format) {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, &config.table.date_format)
        }
    };

    match otd.output {
        Some(ref out) => {
            std::fs::write(out, &output)
                .with_context(|| format!("Failed to write report to {}", out.display()))?;
            println!("✅ Report saved to: {}", out.display());
        }
        None => print!("{}", output),
    }

    // Check --fail-below threshold
    if let Some(threshold) = otd.fail_below {
        let otd_pct = report.headline_otd();
        if otd_pct < threshold {
            eprintln!(
                "\n⛔ OTD {:.2}% is below {:.2}%. Failing (exit code 2).",
                otd_pct, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load configuration from `--config`, the default file, or defaults.
fn load_config(args: &Args) -> Result<Config> {
    match args.config {
        Some(ref config_path) => Config::load(config_path),
        None => Config::load_or_default(Path::new(CONFIG_FILE)),
    }
}

fn open_table(path: &Path, config: &Config) -> Result<Table> {
    store::read_table(path, &config.classifier())
        .with_context(|| format!("Failed to load table {}", path.display()))
}

fn save(table: &Table, path: &Path, date_format: &str) -> Result<()> {
    store::write_table(table, path, date_format)
        .with_context(|| format!("Failed to save table {}", path.display()))
}

fn warn_if_unnamed(fields: &ItemFields) {
    let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
    if blank(&fields.name) && blank(&fields.item_id) {
        warn!("Adding an item with neither a name nor an ID");
    }
}
