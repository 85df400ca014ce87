#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Rolling-window feature engineering over per-location event streams.
//!
//! Training and serving share one aggregation core, [`features_at`]:
//! [`batch_rows`] and [`online_vector`] both delegate to it, which is what
//! keeps the two modes numerically identical at the same cutoff.
//!
//! Two windows feed each vector. Magnitude statistics cover the trailing
//! 30 calendar days up to and including the cutoff; gap statistics cover the
//! trailing 30 events. Both windows are causal: nothing after the cutoff is
//! visible.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use quakecast_catalog_models::{CatalogEvent, TimeBucket};
use quakecast_forecast_models::{
    FeatureVector, LocationCode, LocationEncoder, UnknownLocationError,
};
use thiserror::Error;

/// Span of the trailing magnitude window, in calendar days.
pub const MAGNITUDE_WINDOW_DAYS: i64 = 30;
/// Size of the trailing gap window, in events.
pub const GAP_WINDOW_EVENTS: usize = 30;

/// Errors returned by the feature builder.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The supplied event history is not in ascending timestamp order.
    #[error("event history is out of order: {current} follows {previous}")]
    OutOfOrder {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
    /// A location label was not part of the encoder's fitted set.
    #[error("location error: {0}")]
    UnknownLocation(#[from] UnknownLocationError),
}

/// One event of a single location's history: origin time plus magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSample {
    pub timestamp: DateTime<Utc>,
    pub magnitude: f64,
}

impl EventSample {
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, magnitude: f64) -> Self {
        Self {
            timestamp,
            magnitude,
        }
    }
}

impl From<&CatalogEvent> for EventSample {
    fn from(event: &CatalogEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            magnitude: event.magnitude,
        }
    }
}

/// One training row: the feature vector plus both supervision labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub features: FeatureVector,
    /// Magnitude of the row's own event (regression target).
    pub magnitude: f64,
    /// Bucketized gap to the location's next event (classification target).
    /// The last event of a location has no next gap and falls into the
    /// first bucket.
    pub bucket: TimeBucket,
}

/// Computes the feature vector for one location at one cutoff instant.
///
/// `history` is that location's events in ascending timestamp order; events
/// after `cutoff` are ignored, so callers may pass a full history and let the
/// cutoff select the causal prefix. This function is the single aggregation
/// code path behind both [`batch_rows`] and [`online_vector`].
///
/// Insufficient history never fails: an empty window yields zeroed
/// statistics, never `NaN`.
///
/// # Errors
///
/// * `FeatureError::OutOfOrder` when `history` is not ascending
pub fn features_at(
    code: LocationCode,
    history: &[EventSample],
    cutoff: DateTime<Utc>,
) -> Result<FeatureVector, FeatureError> {
    ensure_ascending(history)?;
    let visible = &history[..history.partition_point(|sample| sample.timestamp <= cutoff)];
    let magnitudes = magnitude_window_stats(visible, cutoff);
    let gaps = gap_window_stats(visible);
    Ok(FeatureVector {
        location_code: f64::from(code),
        count_30d: magnitudes.count,
        mean_mag_30d: magnitudes.mean,
        max_mag_30d: magnitudes.max,
        min_mag_30d: magnitudes.min,
        std_mag_30d: magnitudes.std,
        mean_gap_30: gaps.mean,
        max_gap_30: gaps.max,
        min_gap_30: gaps.min,
    })
}

/// Builds one labeled training row per event, in global time order.
///
/// Events are sorted ascending by timestamp (stable) and grouped by location;
/// each row sees exactly the events at or before its own timestamp.
///
/// # Errors
///
/// * `FeatureError::UnknownLocation` when an event's location is missing
///   from `encoder`
/// * `FeatureError::OutOfOrder` is unreachable here: rows are built from the
///   sorted copy
pub fn batch_rows(
    events: &[CatalogEvent],
    encoder: &LocationEncoder,
) -> Result<Vec<FeatureRow>, FeatureError> {
    let mut ordered: Vec<&CatalogEvent> = events.iter().collect();
    ordered.sort_by_key(|event| event.timestamp);

    let mut histories: BTreeMap<&str, Vec<EventSample>> = BTreeMap::new();
    for event in &ordered {
        histories
            .entry(event.location.as_str())
            .or_default()
            .push(EventSample::from(*event));
    }

    let mut cursors: BTreeMap<&str, usize> = BTreeMap::new();
    let mut rows = Vec::with_capacity(ordered.len());
    for event in &ordered {
        let code = encoder.encode(&event.location)?;
        let history = &histories[event.location.as_str()];
        let features = features_at(code, history, event.timestamp)?;
        let cursor = cursors.entry(event.location.as_str()).or_insert(0);
        let bucket = history
            .get(*cursor + 1)
            .map_or(TimeBucket::Hours0To6, |next| {
                TimeBucket::from_gap_hours(hours_between(event.timestamp, next.timestamp))
            });
        *cursor += 1;
        rows.push(FeatureRow {
            features,
            magnitude: event.magnitude,
            bucket,
        });
    }
    Ok(rows)
}

/// Computes the single serving-time vector from a location's recent tail.
///
/// The cutoff is the tail's last timestamp, matching what the batch builder
/// sees for that event. An empty tail yields the all-zero vector with only
/// the location code set.
///
/// # Errors
///
/// * `FeatureError::OutOfOrder` when `tail` is not ascending
pub fn online_vector(
    code: LocationCode,
    tail: &[EventSample],
) -> Result<FeatureVector, FeatureError> {
    let cutoff = tail.last().map_or_else(Utc::now, |sample| sample.timestamp);
    features_at(code, tail, cutoff)
}

struct MagnitudeStats {
    count: f64,
    mean: f64,
    max: f64,
    min: f64,
    std: f64,
}

struct GapStats {
    mean: f64,
    max: f64,
    min: f64,
}

/// Aggregates magnitudes over the trailing calendar window
/// `(cutoff - 30 days, cutoff]`. The lower bound is open: an event exactly
/// 30 days old has expired.
#[allow(clippy::cast_precision_loss)]
fn magnitude_window_stats(visible: &[EventSample], cutoff: DateTime<Utc>) -> MagnitudeStats {
    let start = cutoff - Duration::days(MAGNITUDE_WINDOW_DAYS);
    let window = &visible[visible.partition_point(|sample| sample.timestamp <= start)..];
    if window.is_empty() {
        return MagnitudeStats {
            count: 0.0,
            mean: 0.0,
            max: 0.0,
            min: 0.0,
            std: 0.0,
        };
    }
    let count = window.len() as f64;
    let sum: f64 = window.iter().map(|sample| sample.magnitude).sum();
    let mean = sum / count;
    let max = window
        .iter()
        .map(|sample| sample.magnitude)
        .fold(f64::NEG_INFINITY, f64::max);
    let min = window
        .iter()
        .map(|sample| sample.magnitude)
        .fold(f64::INFINITY, f64::min);
    MagnitudeStats {
        count,
        mean,
        max,
        min,
        std: sample_std(window, mean),
    }
}

/// Aggregates the defined inter-event gaps, in hours, over the trailing
/// 30-event window. The window's oldest event keeps its gap to the
/// predecessor just outside the window; only the history's very first event
/// has no gap at all.
#[allow(clippy::cast_precision_loss)]
fn gap_window_stats(visible: &[EventSample]) -> GapStats {
    let start = visible.len().saturating_sub(GAP_WINDOW_EVENTS);
    let gaps: Vec<f64> = visible
        .windows(2)
        .skip(start.saturating_sub(1))
        .map(|pair| hours_between(pair[0].timestamp, pair[1].timestamp))
        .collect();
    if gaps.is_empty() {
        return GapStats {
            mean: 0.0,
            max: 0.0,
            min: 0.0,
        };
    }
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let max = gaps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = gaps.iter().copied().fold(f64::INFINITY, f64::min);
    GapStats { mean, max, min }
}

/// Sample standard deviation (n - 1 denominator); 0 below two samples.
fn sample_std(window: &[EventSample], mean: f64) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let spread: f64 = window
        .iter()
        .map(|sample| (sample.magnitude - mean).powi(2))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let denominator = (window.len() - 1) as f64;
    (spread / denominator).sqrt()
}

#[allow(clippy::cast_precision_loss)]
fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_seconds() as f64 / 3600.0
}

fn ensure_ascending(history: &[EventSample]) -> Result<(), FeatureError> {
    for pair in history.windows(2) {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(FeatureError::OutOfOrder {
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone as _, Utc};
    use quakecast_catalog_models::{CatalogEvent, TimeBucket};
    use quakecast_forecast_models::LocationEncoder;

    use super::{EventSample, FeatureError, batch_rows, features_at, online_vector};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn at_days(days: i64) -> DateTime<Utc> {
        base() + Duration::days(days)
    }

    fn at_hours(hours: i64) -> DateTime<Utc> {
        base() + Duration::hours(hours)
    }

    fn sample(days: i64, magnitude: f64) -> EventSample {
        EventSample::new(at_days(days), magnitude)
    }

    fn event(location: &str, days: i64, magnitude: f64) -> CatalogEvent {
        CatalogEvent::new(at_days(days), location.to_owned(), magnitude)
    }

    fn close(actual: f64, wanted: f64) -> bool {
        (actual - wanted).abs() < f64::EPSILON
    }

    #[test]
    fn single_event_yields_count_one_and_zero_spreads() {
        let history = [sample(0, 5.5)];
        let vector = features_at(7, &history, at_days(0)).unwrap();
        assert!(close(vector.location_code, 7.0));
        assert!(close(vector.count_30d, 1.0));
        assert!(close(vector.mean_mag_30d, 5.5));
        assert!(close(vector.max_mag_30d, 5.5));
        assert!(close(vector.min_mag_30d, 5.5));
        assert!(close(vector.std_mag_30d, 0.0));
        assert!(close(vector.mean_gap_30, 0.0));
        assert!(close(vector.max_gap_30, 0.0));
        assert!(close(vector.min_gap_30, 0.0));
    }

    #[test]
    fn three_daily_events_aggregate_as_expected() {
        let history = [sample(0, 4.0), sample(1, 5.0), sample(2, 6.0)];
        let vector = features_at(0, &history, at_days(2)).unwrap();
        assert!(close(vector.count_30d, 3.0));
        assert!(close(vector.mean_mag_30d, 5.0));
        assert!(close(vector.max_mag_30d, 6.0));
        assert!(close(vector.min_mag_30d, 4.0));
        assert!(close(vector.std_mag_30d, 1.0));
        assert!(close(vector.mean_gap_30, 24.0));
        assert!(close(vector.max_gap_30, 24.0));
        assert!(close(vector.min_gap_30, 24.0));
    }

    #[test]
    fn events_after_the_cutoff_are_invisible() {
        let history = [sample(0, 4.0), sample(2, 6.0)];
        let vector = features_at(0, &history, at_days(1)).unwrap();
        assert!(close(vector.count_30d, 1.0));
        assert!(close(vector.mean_mag_30d, 4.0));
        assert!(close(vector.mean_gap_30, 0.0));
    }

    #[test]
    fn an_event_exactly_thirty_days_old_has_expired() {
        let history = [sample(0, 4.0), sample(30, 6.0)];
        let vector = features_at(0, &history, at_days(30)).unwrap();
        assert!(close(vector.count_30d, 1.0));
        assert!(close(vector.mean_mag_30d, 6.0));
        // The expired event still anchors the newest gap.
        assert!(close(vector.mean_gap_30, 720.0));
    }

    #[test]
    fn expired_magnitudes_keep_their_gaps() {
        let history = [sample(0, 3.0), sample(15, 4.0), sample(40, 5.0)];
        let vector = features_at(0, &history, at_days(40)).unwrap();
        assert!(close(vector.count_30d, 2.0));
        assert!(close(vector.mean_mag_30d, 4.5));
        assert!(close(vector.max_mag_30d, 5.0));
        assert!(close(vector.min_mag_30d, 4.0));
        assert!(close(vector.std_mag_30d, 0.5_f64.sqrt()));
        assert!(close(vector.mean_gap_30, 480.0));
        assert!(close(vector.max_gap_30, 600.0));
        assert!(close(vector.min_gap_30, 360.0));
    }

    #[test]
    fn gap_window_caps_at_thirty_events() {
        let history: Vec<EventSample> = (0..35)
            .map(|hour| EventSample::new(at_hours(hour), 4.0))
            .collect();
        let vector = features_at(0, &history, at_hours(34)).unwrap();
        // All 35 events sit inside the 30-day magnitude window, but only the
        // trailing 30 events contribute gaps.
        assert!(close(vector.count_30d, 35.0));
        assert!(close(vector.mean_gap_30, 1.0));
        assert!(close(vector.max_gap_30, 1.0));
        assert!(close(vector.min_gap_30, 1.0));
        assert!(close(vector.std_mag_30d, 0.0));
    }

    #[test]
    fn out_of_order_history_fails_loudly() {
        let history = [sample(2, 4.0), sample(0, 5.0)];
        let err = features_at(0, &history, at_days(2)).unwrap_err();
        assert!(matches!(err, FeatureError::OutOfOrder { .. }));
        assert!(online_vector(0, &history).is_err());
    }

    #[test]
    fn empty_tail_yields_zeroes_except_the_code() {
        let vector = online_vector(3, &[]).unwrap();
        let array = vector.to_array();
        assert!(close(array[0], 3.0));
        assert!(array[1..].iter().all(|&value| close(value, 0.0)));
    }

    #[test]
    fn batch_rows_sort_unordered_input_globally() {
        let events = vec![
            event("ANKARA", 4, 5.0),
            event("ANKARA", 0, 3.0),
            event("ANKARA", 2, 4.0),
        ];
        let encoder = LocationEncoder::fit(["ANKARA"]);
        let rows = batch_rows(&events, &encoder).unwrap();
        let magnitudes: Vec<f64> = rows.iter().map(|row| row.magnitude).collect();
        assert_eq!(magnitudes, vec![3.0, 4.0, 5.0]);
        assert!(close(rows[0].features.count_30d, 1.0));
        assert!(close(rows[1].features.count_30d, 2.0));
        assert!(close(rows[2].features.count_30d, 3.0));
    }

    #[test]
    fn bucket_labels_use_the_gap_to_the_next_event() {
        let events = vec![
            CatalogEvent::new(at_hours(0), "VAN".to_owned(), 4.0),
            CatalogEvent::new(at_hours(8), "VAN".to_owned(), 5.0),
        ];
        let encoder = LocationEncoder::fit(["VAN"]);
        let rows = batch_rows(&events, &encoder).unwrap();
        assert_eq!(rows[0].bucket, TimeBucket::Hours6To12);
        assert_eq!(rows[1].bucket, TimeBucket::Hours0To6);
    }

    #[test]
    fn unknown_locations_are_rejected_in_batch() {
        let events = vec![event("HATAY", 0, 4.0)];
        let encoder = LocationEncoder::fit(["VAN"]);
        let err = batch_rows(&events, &encoder).unwrap_err();
        assert!(matches!(err, FeatureError::UnknownLocation(_)));
    }

    #[test]
    fn batch_and_online_agree_at_every_cutoff() {
        let events = vec![
            event("ANKARA", 0, 3.1),
            event("IZMIR", 1, 4.2),
            event("ANKARA", 2, 3.3),
            event("IZMIR", 3, 4.4),
            event("ANKARA", 4, 3.5),
            event("IZMIR", 5, 4.6),
            event("ANKARA", 6, 3.7),
        ];
        let encoder = LocationEncoder::fit(["ANKARA", "IZMIR"]);
        let rows = batch_rows(&events, &encoder).unwrap();
        assert_eq!(rows.len(), events.len());

        for location in ["ANKARA", "IZMIR"] {
            let code = encoder.encode(location).unwrap();
            let history: Vec<EventSample> = events
                .iter()
                .filter(|event| event.location == location)
                .map(EventSample::from)
                .collect();
            let batch_vectors: Vec<_> = rows
                .iter()
                .filter(|row| close(row.features.location_code, f64::from(code)))
                .map(|row| row.features)
                .collect();
            assert_eq!(batch_vectors.len(), history.len());
            for (index, wanted) in batch_vectors.iter().enumerate() {
                let tail = &history[..=index];
                let online = online_vector(code, tail).unwrap();
                assert_eq!(online, *wanted);
            }
        }
    }
}
