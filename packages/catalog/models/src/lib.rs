#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Earthquake catalog record types and forecast time-bucket definitions.
//!
//! This crate defines the canonical event records shared across the entire
//! quakecast system: raw bulletin events as scraped from the observatory
//! feed, resolved catalog events keyed by province, and the five-way
//! time-to-next-event bucket partition the forecast classifier predicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One event as parsed from the observatory bulletin, before the
/// coordinates have been resolved to a province.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Origin time of the event (UTC).
    pub timestamp: DateTime<Utc>,
    /// Epicenter latitude in decimal degrees.
    pub latitude: f64,
    /// Epicenter longitude in decimal degrees.
    pub longitude: f64,
    /// Hypocenter depth in kilometers.
    pub depth_km: f64,
    /// Magnitude (ML where available).
    pub magnitude: f64,
    /// Free-text place description from the bulletin.
    pub place: String,
}

/// One resolved catalog event: the unit record of the forecast pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEvent {
    /// Origin time of the event (UTC).
    pub timestamp: DateTime<Utc>,
    /// Province label the epicenter resolved to.
    pub location: String,
    /// Magnitude (ML where available).
    pub magnitude: f64,
}

impl CatalogEvent {
    /// Creates a catalog event.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, location: String, magnitude: f64) -> Self {
        Self {
            timestamp,
            location,
            magnitude,
        }
    }
}

/// Discretized time-to-next-event ranges predicted by the forecast
/// classifier.
///
/// The partition is fixed: callers may localize the display labels, but the
/// five classes and their hour boundaries are part of the model contract.
/// Upper edges are inclusive except for the open-ended last bucket.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeBucket {
    /// Within 6 hours (also the default when no gap is defined yet).
    Hours0To6 = 0,
    /// More than 6 and up to 12 hours.
    Hours6To12 = 1,
    /// More than 12 and up to 24 hours.
    Hours12To24 = 2,
    /// More than 1 and up to 3 days.
    Days1To3 = 3,
    /// More than 3 days.
    Days3Plus = 4,
}

impl TimeBucket {
    /// Returns the numeric class index of this bucket.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a bucket from a numeric class index.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 0-4.
    pub const fn from_value(value: u8) -> Result<Self, InvalidBucketError> {
        match value {
            0 => Ok(Self::Hours0To6),
            1 => Ok(Self::Hours6To12),
            2 => Ok(Self::Hours12To24),
            3 => Ok(Self::Days1To3),
            4 => Ok(Self::Days3Plus),
            _ => Err(InvalidBucketError { value }),
        }
    }

    /// Buckets an inter-event gap given in hours.
    ///
    /// Total over all finite non-negative inputs; a gap of 0 (the default
    /// used when no gap is defined) lands in the first bucket.
    #[must_use]
    pub const fn from_gap_hours(hours: f64) -> Self {
        if hours <= 6.0 {
            Self::Hours0To6
        } else if hours <= 12.0 {
            Self::Hours6To12
        } else if hours <= 24.0 {
            Self::Hours12To24
        } else if hours <= 72.0 {
            Self::Days1To3
        } else {
            Self::Days3Plus
        }
    }

    /// Returns the human-readable range label for this bucket.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hours0To6 => "0-6 saat içinde",
            Self::Hours6To12 => "6-12 saat içinde",
            Self::Hours12To24 => "12-24 saat içinde",
            Self::Days1To3 => "1-3 gün içinde",
            Self::Days3Plus => "3+ gün içinde",
        }
    }

    /// Returns all variants of this enum, in class-index order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Hours0To6,
            Self::Hours6To12,
            Self::Hours12To24,
            Self::Days1To3,
            Self::Days3Plus,
        ]
    }
}

/// Error returned when attempting to create a [`TimeBucket`] from an invalid
/// class index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBucketError {
    /// The invalid class index that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidBucketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid time bucket value {}: expected 0-4", self.value)
    }
}

impl std::error::Error for InvalidBucketError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn bucket_from_value_roundtrip() {
        for v in 0..=4u8 {
            let bucket = TimeBucket::from_value(v).unwrap();
            assert_eq!(bucket.value(), v);
        }
        assert!(TimeBucket::from_value(5).is_err());
    }

    #[test]
    fn bucket_boundaries_are_right_closed() {
        let cases = [
            (6.0, TimeBucket::Hours0To6),
            (6.0001, TimeBucket::Hours6To12),
            (12.0, TimeBucket::Hours6To12),
            (24.0, TimeBucket::Hours12To24),
            (72.0, TimeBucket::Days1To3),
            (72.0001, TimeBucket::Days3Plus),
        ];
        for (hours, expected) in cases {
            assert_eq!(
                TimeBucket::from_gap_hours(hours),
                expected,
                "gap of {hours}h bucketed wrong"
            );
        }
    }

    #[test]
    fn zero_gap_defaults_to_first_bucket() {
        assert_eq!(TimeBucket::from_gap_hours(0.0), TimeBucket::Hours0To6);
    }

    #[test]
    fn every_bucket_has_a_distinct_label() {
        let labels: Vec<&str> = TimeBucket::all().iter().map(|b| b.label()).collect();
        for (i, label) in labels.iter().enumerate() {
            assert!(!label.is_empty());
            assert!(!labels[..i].contains(label), "duplicate label {label}");
        }
    }

    #[test]
    fn catalog_event_serializes_camel_case() {
        let event = CatalogEvent::new(
            Utc.with_ymd_and_hms(2024, 2, 6, 4, 17, 0).unwrap(),
            "KAHRAMANMARAS".to_string(),
            7.7,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("timestamp").is_some());
        assert_eq!(json["location"], "KAHRAMANMARAS");
    }
}
