#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Standalone entry point for the forecast API server.
//!
//! Loads `quakecast.toml`, the resolved catalog, and the current model
//! bundle, then hands everything to [`quakecast_server::run_server`].

use quakecast_catalog::EventCatalog;
use quakecast_config::QuakecastConfig;
use quakecast_forecast::{ForecastArtifact, Forecaster};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = QuakecastConfig::load_or_default().expect("Failed to load configuration");

    log::info!("Loading event catalog...");
    let catalog = EventCatalog::load_csv(config.data.catalog_path())
        .expect("Failed to load the event catalog");

    let forecaster = match ForecastArtifact::load(config.artifacts.current_path()) {
        Ok(artifact) => Some(Forecaster::from_artifact(artifact)),
        Err(e) => {
            log::warn!("Serving without a model bundle: {e}");
            None
        }
    };

    let server = config.server.with_env_overrides();
    quakecast_server::run_server(catalog, forecaster, server, config.training.recent_events).await
}
