#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Actix-Web API server for the earthquake forecast application.
//!
//! Serves the REST API over a read-only [`EventCatalog`] and an optional
//! trained [`Forecaster`]. Both are loaded once before the listener binds;
//! handlers never touch the filesystem, so a request can slow down but
//! never corrupt state. A missing or unreadable model bundle degrades the
//! prediction endpoint to `503` instead of failing startup.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Scope, middleware, web};
use quakecast_catalog::EventCatalog;
use quakecast_config::ServerConfig;
use quakecast_forecast::Forecaster;
use quakecast_server_models::ApiError;

/// Shared application state.
pub struct AppState {
    /// In-memory event catalog, ascending by timestamp.
    pub catalog: Arc<EventCatalog>,
    /// Trained forecaster, absent when no bundle could be loaded.
    pub forecaster: Option<Arc<Forecaster>>,
    /// How many trailing events feed a single prediction.
    pub recent_events: usize,
}

/// Starts the forecast API server.
///
/// This is a regular async function; the caller provides the runtime (e.g.
/// via `#[actix_web::main]`) along with the loaded catalog and model.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(
    catalog: EventCatalog,
    forecaster: Option<Forecaster>,
    server: ServerConfig,
    recent_events: usize,
) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        catalog: Arc::new(catalog),
        forecaster: forecaster.map(Arc::new),
        recent_events,
    });

    log::info!(
        "Starting server on {} ({} catalog events, model {})",
        server.address(),
        state.catalog.len(),
        if state.forecaster.is_some() {
            "loaded"
        } else {
            "unavailable"
        }
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        // Malformed JSON bodies get the same {status, message} envelope as
        // every other failure instead of the framework default.
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            let body = ApiError::new(format!("Invalid request body: {err}"));
            actix_web::error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(body),
            )
            .into()
        });

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(json_config)
            .service(api_scope())
    })
    .bind((server.bind, server.port))?
    .run()
    .await
}

/// The `/api` routing table, shared between [`run_server`] and the handler
/// tests.
fn api_scope() -> Scope {
    web::scope("/api")
        .route("/health", web::get().to(handlers::health))
        .route(
            "/largest-earthquakes",
            web::get().to(handlers::largest_earthquakes),
        )
        .route(
            "/earthquakes-by-location",
            web::get().to(handlers::earthquakes_by_location),
        )
        .route(
            "/predict-next-earthquake",
            web::post().to(handlers::predict_next_earthquake),
        )
}
