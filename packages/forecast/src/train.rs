use log::info;
use quakecast_catalog_models::{CatalogEvent, TimeBucket};
use quakecast_features::{FeatureError, FeatureRow, batch_rows};
use quakecast_forecast_models::{LocationEncoder, TrainingReport};
use quakecast_forest::{
    ForestConfig, ForestError, MaxFeatures, RandomForestClassifier, RandomForestRegressor,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::ForecastArtifact;

/// Errors returned by model training.
#[derive(Debug, Error)]
pub enum TrainError {
    /// No labeled rows could be built from the catalog.
    #[error("training set is empty")]
    EmptyTrainingSet,
    /// Feature engineering failed.
    #[error("feature error: {0}")]
    Features(#[from] FeatureError),
    /// Forest fitting or evaluation failed.
    #[error("forest error: {0}")]
    Forest(#[from] ForestError),
}

/// Split and forest hyperparameters for one training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for diagnostics.
    pub holdout_fraction: f64,
    /// Seed for the shuffled train/holdout split.
    pub seed: u64,
    pub magnitude_forest: ForestConfig,
    pub bucket_forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.15,
            seed: 42,
            magnitude_forest: ForestConfig::default(),
            bucket_forest: ForestConfig {
                max_features: MaxFeatures::Sqrt,
                ..ForestConfig::default()
            },
        }
    }
}

/// Trains the magnitude regressor and the time-bucket classifier from a
/// resolved event catalog and bundles them into a fresh artifact.
///
/// The encoder is fitted on the catalog's distinct locations, rows come from
/// the shared batch feature builder, and the holdout metrics recorded in the
/// report are diagnostic only: poor scores never fail the run. Training is
/// single-threaded and runs to completion.
///
/// # Errors
///
/// * `TrainError::EmptyTrainingSet` when `events` yields no rows
/// * `TrainError::Features` when feature engineering fails
/// * `TrainError::Forest` when a forest rejects its inputs
pub fn train_models(
    events: &[CatalogEvent],
    config: &TrainingConfig,
) -> Result<ForecastArtifact, TrainError> {
    let encoder = LocationEncoder::fit(events.iter().map(|event| event.location.clone()));
    let rows = batch_rows(events, &encoder)?;
    if rows.is_empty() {
        return Err(TrainError::EmptyTrainingSet);
    }

    let (train, holdout) = split_rows(&rows, config.holdout_fraction, config.seed);
    info!(
        "training forests on {} rows ({} holdout) across {} locations",
        train.len(),
        holdout.len(),
        encoder.len()
    );

    let features: Vec<Vec<f64>> = train
        .iter()
        .map(|row| row.features.to_array().to_vec())
        .collect();
    let magnitudes: Vec<f64> = train.iter().map(|row| row.magnitude).collect();
    let labels: Vec<usize> = train
        .iter()
        .map(|row| usize::from(row.bucket.value()))
        .collect();

    let magnitude_model =
        RandomForestRegressor::fit(&features, &magnitudes, &config.magnitude_forest)?;
    let weights = balanced_class_weights(&labels, TimeBucket::all().len());
    let bucket_model =
        RandomForestClassifier::fit(&features, &labels, Some(&weights), &config.bucket_forest)?;

    let report = build_report(&rows, &train, &holdout, &magnitude_model, &bucket_model)?;
    info!(
        "holdout diagnostics: magnitude mse {:.4}, bucket accuracy {:.3}",
        report.magnitude_mse, report.bucket_accuracy
    );
    Ok(ForecastArtifact::new(
        encoder,
        magnitude_model,
        bucket_model,
        report,
    ))
}

/// Shuffles row indices with a seeded RNG and peels off the holdout. At
/// least one row always stays on the training side.
fn split_rows(
    rows: &[FeatureRow],
    fraction: f64,
    seed: u64,
) -> (Vec<&FeatureRow>, Vec<&FeatureRow>) {
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (holdout_indices, train_indices) = indices.split_at(holdout_size(rows.len(), fraction));
    (
        train_indices.iter().map(|&index| &rows[index]).collect(),
        holdout_indices.iter().map(|&index| &rows[index]).collect(),
    )
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn holdout_size(total: usize, fraction: f64) -> usize {
    let raw = (total as f64 * fraction.clamp(0.0, 1.0)).ceil() as usize;
    raw.min(total.saturating_sub(1))
}

/// Balanced class weights, `n / (k_present * count_c)` for each class
/// present in `labels`. Absent classes get weight 0, which nothing reads.
#[allow(clippy::cast_precision_loss)]
fn balanced_class_weights(labels: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0_usize; n_classes];
    for &label in labels {
        if let Some(slot) = counts.get_mut(label) {
            *slot += 1;
        }
    }
    let present = counts.iter().filter(|&&count| count > 0).count().max(1);
    let numerator = labels.len() as f64 / present as f64;
    counts
        .iter()
        .map(|&count| {
            if count == 0 {
                0.0
            } else {
                numerator / count as f64
            }
        })
        .collect()
}

fn build_report(
    rows: &[FeatureRow],
    train: &[&FeatureRow],
    holdout: &[&FeatureRow],
    magnitude_model: &RandomForestRegressor,
    bucket_model: &RandomForestClassifier,
) -> Result<TrainingReport, ForestError> {
    let mut bucket_counts = [0_usize; TimeBucket::all().len()];
    for row in rows {
        bucket_counts[usize::from(row.bucket.value())] += 1;
    }
    let (magnitude_mse, bucket_accuracy) = holdout_metrics(holdout, magnitude_model, bucket_model)?;
    Ok(TrainingReport {
        total_rows: rows.len(),
        train_rows: train.len(),
        holdout_rows: holdout.len(),
        magnitude_mse,
        bucket_accuracy,
        bucket_counts,
    })
}

#[allow(clippy::cast_precision_loss)]
fn holdout_metrics(
    holdout: &[&FeatureRow],
    magnitude_model: &RandomForestRegressor,
    bucket_model: &RandomForestClassifier,
) -> Result<(f64, f64), ForestError> {
    if holdout.is_empty() {
        return Ok((0.0, 0.0));
    }
    let mut squared = 0.0;
    let mut correct = 0_usize;
    for row in holdout {
        let features = row.features.to_array();
        let predicted = magnitude_model.predict_row(&features)?;
        squared += (predicted - row.magnitude).powi(2);
        if bucket_model.predict_row(&features)? == usize::from(row.bucket.value()) {
            correct += 1;
        }
    }
    let count = holdout.len() as f64;
    Ok((squared / count, correct as f64 / count))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone as _, Utc};
    use quakecast_catalog_models::CatalogEvent;
    use quakecast_forest::{ForestConfig, MaxFeatures};

    use super::{TrainError, TrainingConfig, balanced_class_weights, holdout_size, train_models};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    fn small_forest(max_features: MaxFeatures) -> ForestConfig {
        ForestConfig {
            n_trees: 10,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
            seed: 42,
        }
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            holdout_fraction: 0.15,
            seed: 42,
            magnitude_forest: small_forest(MaxFeatures::All),
            bucket_forest: small_forest(MaxFeatures::Sqrt),
        }
    }

    fn synthetic_events() -> Vec<CatalogEvent> {
        let mut events = Vec::new();
        for step in 0..30_i64 {
            events.push(CatalogEvent::new(
                base() + Duration::hours(step * 5),
                "VAN".to_owned(),
                4.0 + f64::from(i32::try_from(step % 7).unwrap()) * 0.1,
            ));
            events.push(CatalogEvent::new(
                base() + Duration::hours(step * 50),
                "IZMIR".to_owned(),
                3.0 + f64::from(i32::try_from(step % 5).unwrap()) * 0.1,
            ));
        }
        events
    }

    #[test]
    fn training_is_deterministic() {
        let events = synthetic_events();
        let first = train_models(&events, &small_config()).unwrap();
        let second = train_models(&events, &small_config()).unwrap();
        assert_eq!(first.magnitude_model, second.magnitude_model);
        assert_eq!(first.bucket_model, second.bucket_model);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn an_empty_catalog_fails_training() {
        let err = train_models(&[], &small_config()).unwrap_err();
        assert!(matches!(err, TrainError::EmptyTrainingSet));
    }

    #[test]
    fn report_counts_add_up() {
        let events = synthetic_events();
        let artifact = train_models(&events, &small_config()).unwrap();
        let report = &artifact.report;
        assert_eq!(report.total_rows, events.len());
        assert_eq!(report.train_rows + report.holdout_rows, report.total_rows);
        assert_eq!(
            report.bucket_counts.iter().sum::<usize>(),
            report.total_rows
        );
        assert!(report.holdout_rows > 0);
    }

    #[test]
    fn a_single_event_trains_without_a_holdout() {
        let events = vec![CatalogEvent::new(base(), "VAN".to_owned(), 4.5)];
        let artifact = train_models(&events, &small_config()).unwrap();
        assert_eq!(artifact.report.train_rows, 1);
        assert_eq!(artifact.report.holdout_rows, 0);
        assert!(artifact.report.magnitude_mse.abs() < f64::EPSILON);
    }

    #[test]
    fn holdout_never_swallows_the_whole_set() {
        assert_eq!(holdout_size(1, 0.15), 0);
        assert_eq!(holdout_size(2, 0.15), 1);
        assert_eq!(holdout_size(100, 0.15), 15);
        assert_eq!(holdout_size(10, 1.0), 9);
    }

    #[test]
    fn balanced_weights_favor_rare_classes() {
        let labels = [0, 0, 0, 1];
        let weights = balanced_class_weights(&labels, 5);
        // n = 4, two present classes: 4 / (2 * 3) and 4 / (2 * 1).
        assert!((weights[0] - 4.0 / 6.0).abs() < f64::EPSILON);
        assert!((weights[1] - 2.0).abs() < f64::EPSILON);
        assert!(weights[2].abs() < f64::EPSILON);
        assert!(weights[1] > weights[0]);
    }
}
