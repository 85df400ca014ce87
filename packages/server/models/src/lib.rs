#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! API request and response types for the forecast server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the catalog row types so the wire contract can evolve independently
//! of the on-disk schema. Field names are part of that contract; renaming
//! one is a breaking API change.

use chrono::{DateTime, Utc};
use quakecast_catalog_models::CatalogEvent;
use quakecast_forecast_models::Forecast;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// A catalog event as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ApiEvent {
    /// When the event occurred (ISO 8601).
    pub timestamp: DateTime<Utc>,
    /// Resolved province label.
    pub location: String,
    /// Local magnitude.
    pub magnitude: f64,
}

impl From<&CatalogEvent> for ApiEvent {
    fn from(event: &CatalogEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            location: event.location.clone(),
            magnitude: event.magnitude,
        }
    }
}

/// Envelope for the event list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct EventListResponse {
    /// Always `"success"`.
    pub status: String,
    /// Matching events, largest first.
    pub data: Vec<ApiEvent>,
    /// Number of entries in `data`.
    pub count: usize,
}

impl EventListResponse {
    #[must_use]
    pub fn success(data: Vec<ApiEvent>) -> Self {
        Self {
            status: "success".to_string(),
            count: data.len(),
            data,
        }
    }
}

/// Query parameters for the by-location endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationQueryParams {
    /// Province label to filter by (matched case-insensitively).
    pub location: Option<String>,
}

/// Request body for the prediction endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    /// Province label to forecast (matched case-insensitively).
    pub location: Option<String>,
}

/// Response from the prediction endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    /// Always `"success"`.
    pub status: String,
    /// Normalized province label the forecast is for.
    pub location: String,
    /// Expected magnitude of the next event, rounded to two decimals.
    pub predicted_magnitude: f64,
    /// Human-readable expected time window.
    pub predicted_time_range: String,
}

impl From<Forecast> for PredictResponse {
    fn from(forecast: Forecast) -> Self {
        Self {
            status: "success".to_string(),
            location: forecast.location,
            predicted_magnitude: forecast.magnitude,
            predicted_time_range: forecast.time_range,
        }
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Always `"error"`.
    pub status: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}
