//! glucoview command line
//!
//! Usage:
//!   glucoview analyze <readings.json> [period]  - Analyze readings (7days, 14days, 30days, 90days)
//!   glucoview classify <value>                  - Classify one value in mg/dL
//!   glucoview mask <file.json>                  - Print a PII-masked copy of a JSON file
//!   glucoview add <value> <context> [notes]     - Record a reading in the local store
//!   glucoview path                              - Show data file locations
//!   GLUCOVIEW_DBG=1 glucoview ...               - Enable debug output

use std::env;
use std::fs;

use chrono::Utc;
use log::{info, warn};

use glucoview::config::{
    config_file_path, default_store_path, ensure_data_dir, get_data_dir, Config,
};
use glucoview::error::GlucoViewError;
use glucoview::logger::SafeLogger;
use glucoview::reading::{MeasurementContext, Reading};
use glucoview::stats::{AnalysisPeriod, GlucoseAnalysis};
use glucoview::storage::ReadingStore;
use glucoview::units::classify_value;

fn main() -> Result<(), GlucoViewError> {
    let args: Vec<String> = env::args().collect();

    // Check for debug mode
    let debug_mode = env::var("GLUCOVIEW_DBG").is_ok();
    let default_filter = if debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    // Ensure data directory exists
    if let Err(e) = ensure_data_dir() {
        eprintln!("Warning: Could not create data directory: {}", e);
    }

    // Create default config if it doesn't exist
    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Config::create_default(&cfg_path) {
            warn!("Could not create default config: {}", e);
        }
    }

    // Try loading config from data directory first, then current directory
    let config = Config::load(&cfg_path)
        .or_else(|_| Config::load("config.txt"))
        .unwrap_or_else(|e| {
            warn!("Could not load config: {}. Using defaults.", e);
            Config::default()
        });

    let logger = SafeLogger::new(config.masker(), debug_mode || config.debug_log);

    match args.get(1).map(|s| s.as_str()) {
        Some("analyze") => cmd_analyze(&args[2..])?,
        Some("classify") => cmd_classify(&args[2..], &config)?,
        Some("mask") => cmd_mask(&args[2..], &logger)?,
        Some("add") => cmd_add(&args[2..], &config, &logger)?,
        Some("path") | Some("paths") => cmd_show_paths(&config),
        Some("--version") | Some("-V") => {
            println!("glucoview {}", env!("CARGO_PKG_VERSION"));
        }
        Some("--help") | Some("-h") | Some("help") | None => print_help(),
        Some(other) => {
            print_help();
            return Err(GlucoViewError::UnknownCommand(other.to_string()));
        }
    }

    Ok(())
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str, GlucoViewError> {
    args.get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| GlucoViewError::Config(format!("missing argument: {}", what)))
}

/// Analyze a JSON array of readings
fn cmd_analyze(args: &[String]) -> Result<(), GlucoViewError> {
    let path = required(args, 0, "readings file")?;
    let period: AnalysisPeriod = match args.get(1) {
        Some(p) => p.parse().map_err(GlucoViewError::Config)?,
        None => AnalysisPeriod::default(),
    };

    let readings: Vec<Reading> = serde_json::from_str(&fs::read_to_string(path)?)?;
    info!("Analyzing {} readings over {} days", readings.len(), period.days());

    let analysis = GlucoseAnalysis::from_readings(&readings, period, Utc::now());
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn cmd_classify(args: &[String], config: &Config) -> Result<(), GlucoViewError> {
    let raw = required(args, 0, "value")?;
    let value: f64 = raw
        .parse()
        .map_err(|_| GlucoViewError::Config(format!("not a number: {}", raw)))?;

    let classification = classify_value(value);
    let label = match config.locale {
        glucoview::Locale::De => classification.label,
        glucoview::Locale::Ar => classification.label_arabic,
    };
    eprintln!("{} mg/dL: {}", value, label);
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

/// Print a masked copy of a JSON document
fn cmd_mask(args: &[String], logger: &SafeLogger) -> Result<(), GlucoViewError> {
    let path = required(args, 0, "JSON file")?;
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;

    let masked = logger.masker().mask_json(&value);
    println!("{}", serde_json::to_string_pretty(&masked)?);
    Ok(())
}

/// Record a reading in the local store
fn cmd_add(args: &[String], config: &Config, logger: &SafeLogger) -> Result<(), GlucoViewError> {
    let raw = required(args, 0, "value")?;
    let value: f64 = raw
        .parse()
        .map_err(|_| GlucoViewError::Config(format!("not a number: {}", raw)))?;
    let context: MeasurementContext = required(args, 1, "context")?
        .parse()
        .map_err(GlucoViewError::Config)?;
    let notes = args.get(2).cloned();

    let mut store = ReadingStore::open(config.store_path())?;
    let reading = store.add_reading(value, context, notes, Utc::now())?.clone();
    store.save()?;

    logger.info("Reading added", &reading);
    let classification = classify_value(reading.value);
    eprintln!(
        "Saved {} ({}, {})",
        glucoview::units::format_glucose_value(reading.value),
        context.translate(config.locale),
        classification.label
    );
    eprintln!("  Total in store: {}", store.count());
    Ok(())
}

/// Show data paths
fn cmd_show_paths(config: &Config) {
    println!("glucoview data paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Config file:     {}", config_file_path().display());
    println!("  Reading store:   {}", config.store_path().display());
    println!("  Default store:   {}", default_store_path().display());
}

fn print_help() {
    eprintln!("glucoview v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  glucoview analyze <readings.json> [period]  Analyze readings");
    eprintln!("                                              (7days|14days|30days|90days)");
    eprintln!("  glucoview classify <value>                  Classify a value in mg/dL");
    eprintln!("  glucoview mask <file.json>                  Print a PII-masked copy");
    eprintln!("  glucoview add <value> <context> [notes]     Record a reading");
    eprintln!("  glucoview path                              Show data file locations");
    eprintln!("  glucoview help                              Show this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  GLUCOVIEW_DBG=1                             Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Store:   {}", default_store_path().display());
    eprintln!("  Config:  {}", config_file_path().display());
}
