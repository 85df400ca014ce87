#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Forecast model training, prediction, and artifact storage.
//!
//! [`train_models`] turns a resolved event catalog into a [`ForecastArtifact`]
//! bundling the location encoder, the magnitude regressor, and the
//! time-bucket classifier. [`Forecaster`] wraps a loaded bundle for serving:
//! prediction is read-only, so one instance can be shared across threads
//! behind an `Arc`.

pub mod artifact;
pub mod train;

use quakecast_catalog_models::TimeBucket;
use quakecast_features::{EventSample, FeatureError, online_vector};
use quakecast_forecast_models::{Forecast, LocationEncoder, UnknownLocationError};
use quakecast_forest::{ForestError, RandomForestClassifier, RandomForestRegressor};
use thiserror::Error;

pub use crate::artifact::{ARTIFACT_FORMAT, ArtifactError, ArtifactVersion, ForecastArtifact};
pub use crate::train::{TrainError, TrainingConfig, train_models};

/// Errors returned when serving a prediction.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The requested location was not part of the trained label set.
    #[error("location error: {0}")]
    UnknownLocation(#[from] UnknownLocationError),
    /// Feature engineering rejected the supplied history.
    #[error("feature error: {0}")]
    Features(#[from] FeatureError),
    /// A model rejected the feature vector.
    #[error("model error: {0}")]
    Model(#[from] ForestError),
    /// The classifier produced a class index outside the bucket table.
    #[error("model produced an invalid time bucket index: {class}")]
    InvalidBucket { class: usize },
}

/// Read-only predictor built from a trained artifact.
#[derive(Debug, Clone)]
pub struct Forecaster {
    encoder: LocationEncoder,
    magnitude_model: RandomForestRegressor,
    bucket_model: RandomForestClassifier,
}

impl Forecaster {
    #[must_use]
    pub fn from_artifact(artifact: ForecastArtifact) -> Self {
        Self {
            encoder: artifact.encoder,
            magnitude_model: artifact.magnitude_model,
            bucket_model: artifact.bucket_model,
        }
    }

    /// Predicts the next event's magnitude and time bucket for `location`.
    ///
    /// `history` is the location's recent tail in ascending order (callers
    /// pass the last 30 catalog events). An empty history is served from the
    /// all-zero vector rather than rejected.
    ///
    /// # Errors
    ///
    /// * `ForecastError::UnknownLocation` for labels outside the trained set
    /// * `ForecastError::Features` when `history` is out of order
    /// * `ForecastError::Model` when a model rejects the vector
    /// * `ForecastError::InvalidBucket` when the classifier emits an index
    ///   outside the bucket table
    pub fn predict(
        &self,
        location: &str,
        history: &[EventSample],
    ) -> Result<Forecast, ForecastError> {
        let code = self.encoder.encode(location)?;
        let vector = online_vector(code, history)?;
        let features = vector.to_array();
        let magnitude = self.magnitude_model.predict_row(&features)?;
        let class = self.bucket_model.predict_row(&features)?;
        let bucket = TimeBucket::all()
            .get(class)
            .copied()
            .ok_or(ForecastError::InvalidBucket { class })?;
        Ok(Forecast {
            location: location.to_owned(),
            magnitude: round_hundredths(magnitude),
            bucket,
            time_range: bucket.label().to_owned(),
        })
    }

    /// Locations the underlying encoder was fitted on.
    #[must_use]
    pub const fn encoder(&self) -> &LocationEncoder {
        &self.encoder
    }
}

/// Presentation rounding for served magnitudes.
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
