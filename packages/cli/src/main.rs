#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Command-line orchestrator for the quakecast toolchain.
//!
//! Each pipeline stage is a subcommand (`fetch`, `resolve`, `train`,
//! `predict`, `top`, `serve`); running without one drops into the
//! interactive menu. Uses `indicatif-log-bridge` (via
//! [`quakecast_cli_utils::init_logger`]) so log lines and progress bars
//! never fight for the terminal.

mod menu;

use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};
use quakecast_bulletin::{BulletinClient, BulletinConfig};
use quakecast_catalog::EventCatalog;
use quakecast_catalog_models::CatalogEvent;
use quakecast_cli_utils::{IndicatifProgress, MultiProgress};
use quakecast_config::{QuakecastConfig, TrainingSettings};
use quakecast_features::EventSample;
use quakecast_forecast::{ForecastArtifact, Forecaster, TrainingConfig, train_models};
use quakecast_forest::{ForestConfig, MaxFeatures};
use quakecast_geography::ProvinceIndex;

#[derive(Parser)]
#[command(name = "quakecast", about = "Earthquake catalog and forecast toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest observatory bulletin into the raw catalog
    Fetch {
        /// Maximum number of fetched events to keep (for testing)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Resolve raw events to provinces, rebuilding the training catalog
    Resolve,
    /// Train the forecast models and save a new bundle
    Train,
    /// Forecast the next event for one province
    Predict {
        /// Province label (e.g., "VAN")
        location: String,
    },
    /// Show the largest recorded events
    Top {
        /// Restrict to one province
        #[arg(long)]
        location: Option<String>,
        /// Number of events to show
        #[arg(long, default_value = "5")]
        count: usize,
    },
    /// Start the API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = quakecast_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = QuakecastConfig::load_or_default()?;

    let Some(command) = cli.command else {
        return menu::run(&config);
    };

    match command {
        Commands::Fetch { limit } => fetch(&config, limit, &multi).await?,
        Commands::Resolve => resolve(&config)?,
        Commands::Train => train(&config)?,
        Commands::Predict { location } => predict(&config, &location)?,
        Commands::Top { location, count } => top(&config, location.as_deref(), count)?,
        Commands::Serve => serve(config).await?,
    }

    Ok(())
}

/// Syncs the observatory bulletin into the raw catalog file.
async fn fetch(
    config: &QuakecastConfig,
    limit: Option<usize>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let raw_path = config.data.raw_catalog_path();
    ensure_parent_dir(&raw_path)?;

    let client = BulletinClient::new(BulletinConfig::default())?;
    let progress = IndicatifProgress::records_bar(multi, "Fetching bulletin");
    let outcome = quakecast_bulletin::sync(&client, &raw_path, limit, &progress).await?;

    log::info!(
        "Fetch complete: {} new events ({} total) in {:.1}s",
        outcome.added,
        outcome.total,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Resolves raw events to provinces and rebuilds the training catalog.
fn resolve(config: &QuakecastConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let raw_path = config.data.raw_catalog_path();
    if !raw_path.is_file() {
        return Err(format!("No raw catalog at {}; run 'fetch' first", raw_path.display()).into());
    }

    let raw = quakecast_catalog::load_raw_csv(&raw_path)?;
    let index = match config.data.province_bounds_path() {
        Some(path) => ProvinceIndex::load(path)?,
        None => ProvinceIndex::builtin(),
    };

    let catalog = EventCatalog::from_events(index.resolve_events(&raw));
    let catalog_path = config.data.catalog_path();
    ensure_parent_dir(&catalog_path)?;
    catalog.save_csv(&catalog_path)?;

    log::info!(
        "Resolved {} events across {} provinces in {:.1}s",
        catalog.len(),
        catalog.locations().len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Trains both forecast models and saves the bundle.
fn train(config: &QuakecastConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let catalog_path = config.data.catalog_path();
    if !catalog_path.is_file() {
        return Err(format!(
            "No catalog at {}; run 'fetch' and 'resolve' first",
            catalog_path.display()
        )
        .into());
    }

    let catalog = EventCatalog::load_csv(&catalog_path)?;
    log::info!("Training on {} catalog events...", catalog.len());

    let artifact = train_models(catalog.events(), &training_config(&config.training))?;
    let report = &artifact.report;
    log::info!(
        "Holdout diagnostics: magnitude MSE {:.4}, bucket accuracy {:.1}% ({} train / {} holdout rows)",
        report.magnitude_mse,
        report.bucket_accuracy * 100.0,
        report.train_rows,
        report.holdout_rows
    );

    let bundle_path = config.artifacts.current_path();
    ensure_parent_dir(&bundle_path)?;
    artifact.save(&bundle_path)?;

    log::info!("Training complete in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Forecasts the next event for one province using the saved bundle.
fn predict(config: &QuakecastConfig, location: &str) -> Result<(), Box<dyn std::error::Error>> {
    let location = location.trim().to_uppercase();
    let bundle_path = config.artifacts.current_path();
    if !bundle_path.is_file() {
        return Err(format!(
            "No model bundle at {}; run 'train' first",
            bundle_path.display()
        )
        .into());
    }

    let forecaster = Forecaster::from_artifact(ForecastArtifact::load(&bundle_path)?);
    let catalog = EventCatalog::load_csv(config.data.catalog_path())?;
    let history: Vec<EventSample> = catalog
        .recent_for_location(&location, config.training.recent_events)
        .into_iter()
        .map(EventSample::from)
        .collect();

    let forecast = forecaster.predict(&location, &history)?;
    println!("Next event forecast for {}", forecast.location);
    println!("  magnitude: {:.2}", forecast.magnitude);
    println!("  expected:  {}", forecast.time_range);
    Ok(())
}

/// Prints the largest recorded events, optionally for one province.
fn top(
    config: &QuakecastConfig,
    location: Option<&str>,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = EventCatalog::load_csv(config.data.catalog_path())?;

    let events = match location {
        Some(raw) => {
            let upper = raw.trim().to_uppercase();
            let events = catalog.largest_for_location(&upper, count);
            if events.is_empty() {
                return Err(format!("No records found for location '{upper}'").into());
            }
            events
        }
        None => catalog.largest(count),
    };

    println!("{:<21} {:<24} MAG", "DATE (UTC)", "LOCATION");
    println!("{}", "-".repeat(52));
    for event in &events {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &CatalogEvent) {
    println!(
        "{:<21} {:<24} {:.1}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        event.location,
        event.magnitude
    );
}

/// Starts the API server over the current catalog and bundle.
async fn serve(config: QuakecastConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = EventCatalog::load_csv(config.data.catalog_path())?;
    let forecaster = match ForecastArtifact::load(config.artifacts.current_path()) {
        Ok(artifact) => Some(Forecaster::from_artifact(artifact)),
        Err(e) => {
            log::warn!("Serving without a model bundle: {e}");
            None
        }
    };

    let server = config.server.with_env_overrides();
    let recent_events = config.training.recent_events;

    // The server uses actix-web's runtime, so run it in a blocking task to
    // avoid nesting runtimes inside tokio.
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(quakecast_server::run_server(
            catalog,
            forecaster,
            server,
            recent_events,
        ))
    })
    .await??;
    Ok(())
}

/// Maps the file-level training settings onto the model training recipe.
fn training_config(settings: &TrainingSettings) -> TrainingConfig {
    let forest = ForestConfig {
        n_trees: settings.trees,
        max_depth: settings.max_depth,
        min_samples_split: settings.min_samples_split,
        min_samples_leaf: settings.min_samples_leaf,
        seed: settings.seed,
        ..ForestConfig::default()
    };

    TrainingConfig {
        holdout_fraction: settings.holdout_fraction,
        seed: settings.seed,
        magnitude_forest: ForestConfig {
            max_features: MaxFeatures::All,
            ..forest
        },
        bucket_forest: ForestConfig {
            max_features: MaxFeatures::Sqrt,
            ..forest
        },
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
