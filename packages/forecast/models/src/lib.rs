#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared types for the forecast pipeline: the fixed feature schema, the
//! location label encoder, and the training/prediction records that travel
//! inside model artifacts.

use std::error::Error;
use std::fmt::{Display, Formatter};

use quakecast_catalog_models::TimeBucket;
use serde::{Deserialize, Serialize};

/// Integer code assigned to a location label by [`LocationEncoder`].
pub type LocationCode = u32;

/// One fixed-width feature record, in schema order.
///
/// The field order is a contract shared between training and serving; the
/// ordered name list is persisted inside artifacts so a loader can refuse a
/// bundle built against a different schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub location_code: f64,
    pub count_30d: f64,
    pub mean_mag_30d: f64,
    pub max_mag_30d: f64,
    pub min_mag_30d: f64,
    pub std_mag_30d: f64,
    pub mean_gap_30: f64,
    pub max_gap_30: f64,
    pub min_gap_30: f64,
}

impl FeatureVector {
    pub const LEN: usize = 9;

    /// Field names in schema order.
    pub const FIELD_NAMES: [&'static str; Self::LEN] = [
        "location_code",
        "count_30d",
        "mean_mag_30d",
        "max_mag_30d",
        "min_mag_30d",
        "std_mag_30d",
        "mean_gap_30",
        "max_gap_30",
        "min_gap_30",
    ];

    #[must_use]
    pub const fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.location_code,
            self.count_30d,
            self.mean_mag_30d,
            self.max_mag_30d,
            self.min_mag_30d,
            self.std_mag_30d,
            self.mean_gap_30,
            self.max_gap_30,
            self.min_gap_30,
        ]
    }
}

/// Maps location labels to dense integer codes.
///
/// Codes follow the lexicographic order of the distinct fitted labels, so a
/// refit over the same label set always assigns the same codes. The fitted
/// encoder ships inside the model artifact and is never re-derived at
/// serving time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEncoder {
    names: Vec<String>,
}

impl LocationEncoder {
    /// Fits an encoder over the distinct labels, sorted lexicographically.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = labels.into_iter().map(Into::into).collect();
        names.sort_unstable();
        names.dedup();
        Self { names }
    }

    /// Returns the code assigned to `location`.
    ///
    /// # Errors
    ///
    /// * `UnknownLocationError` when `location` was not part of the fitted
    ///   label set
    #[allow(clippy::cast_possible_truncation)] // label sets are tiny
    pub fn encode(&self, location: &str) -> Result<LocationCode, UnknownLocationError> {
        self.names
            .binary_search_by(|name| name.as_str().cmp(location))
            .map(|index| index as LocationCode)
            .map_err(|_| UnknownLocationError {
                location: location.to_owned(),
            })
    }

    /// Returns the label assigned to `code`, if any.
    #[must_use]
    pub fn decode(&self, code: LocationCode) -> Option<&str> {
        self.names.get(code as usize).map(String::as_str)
    }

    /// Fitted labels in code order.
    #[must_use]
    pub fn locations(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A location label the encoder was never fitted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocationError {
    pub location: String,
}

impl Display for UnknownLocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown location: {}", self.location)
    }
}

impl Error for UnknownLocationError {}

/// One served prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: String,
    /// Predicted magnitude, rounded to two decimals for presentation.
    pub magnitude: f64,
    pub bucket: TimeBucket,
    /// Human-readable range string for `bucket`.
    pub time_range: String,
}

/// Holdout diagnostics recorded at training time.
///
/// Metrics are informational; poor scores never fail a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub total_rows: usize,
    pub train_rows: usize,
    pub holdout_rows: usize,
    /// Mean squared error of the magnitude model on the holdout.
    pub magnitude_mse: f64,
    /// Fraction of holdout rows whose bucket was predicted exactly.
    pub bucket_accuracy: f64,
    /// Label counts over every row, indexed by bucket value.
    pub bucket_counts: [usize; TimeBucket::all().len()],
}

#[cfg(test)]
mod tests {
    use super::{FeatureVector, LocationEncoder};

    #[test]
    fn encoder_assigns_codes_in_sorted_label_order() {
        let encoder = LocationEncoder::fit(["VAN", "ANKARA", "IZMIR", "ANKARA"]);
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.encode("ANKARA").unwrap(), 0);
        assert_eq!(encoder.encode("IZMIR").unwrap(), 1);
        assert_eq!(encoder.encode("VAN").unwrap(), 2);
    }

    #[test]
    fn unseen_labels_are_rejected() {
        let encoder = LocationEncoder::fit(["ANKARA"]);
        let err = encoder.encode("PARIS").unwrap_err();
        assert_eq!(err.location, "PARIS");
        assert_eq!(err.to_string(), "unknown location: PARIS");
    }

    #[test]
    fn decode_round_trips_every_fitted_label() {
        let encoder = LocationEncoder::fit(["MUGLA", "BURSA", "KONYA"]);
        for name in encoder.locations() {
            let code = encoder.encode(name).unwrap();
            assert_eq!(encoder.decode(code), Some(name.as_str()));
        }
        assert_eq!(encoder.decode(99), None);
    }

    #[test]
    fn an_empty_encoder_rejects_everything() {
        let encoder = LocationEncoder::fit(Vec::<String>::new());
        assert!(encoder.is_empty());
        assert!(encoder.encode("ANKARA").is_err());
    }

    #[test]
    fn encoder_survives_serialization() {
        let encoder = LocationEncoder::fit(["VAN", "ANKARA"]);
        let encoded = serde_json::to_string(&encoder).unwrap();
        let decoded: LocationEncoder = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, encoder);
    }

    #[test]
    fn feature_schema_is_nine_named_fields() {
        assert_eq!(FeatureVector::LEN, 9);
        assert_eq!(FeatureVector::FIELD_NAMES.len(), 9);
        assert_eq!(FeatureVector::FIELD_NAMES[0], "location_code");
        assert_eq!(FeatureVector::FIELD_NAMES[8], "min_gap_30");
    }

    #[test]
    fn to_array_preserves_schema_order() {
        let vector = FeatureVector {
            location_code: 1.0,
            count_30d: 2.0,
            mean_mag_30d: 3.0,
            max_mag_30d: 4.0,
            min_mag_30d: 5.0,
            std_mag_30d: 6.0,
            mean_gap_30: 7.0,
            max_gap_30: 8.0,
            min_gap_30: 9.0,
        };
        for (index, value) in vector.to_array().into_iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let wanted = (index + 1) as f64;
            assert!((value - wanted).abs() < f64::EPSILON);
        }
    }
}
