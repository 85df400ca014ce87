#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CSV-backed earthquake catalog store.
//!
//! Loads, persists and queries the two on-disk event files: the raw bulletin
//! file (unresolved coordinates, newest first) and the resolved catalog
//! (province-labelled events, oldest first). The resolved catalog is the
//! source of truth for the forecast pipeline; everything downstream receives
//! events in ascending time order from here.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use quakecast_catalog_models::{CatalogEvent, RawEvent};
use thiserror::Error;

/// Timestamp format used in the resolved catalog CSV.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format used in the raw bulletin CSV (the bulletin's own
/// date style).
pub const RAW_TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Column headers of the resolved catalog CSV.
pub const CATALOG_HEADERS: [&str; 3] = ["Tarih_Saat", "Konum", "Buyukluk"];

/// Column headers of the raw bulletin CSV.
pub const RAW_HEADERS: [&str; 6] = ["Tarih", "Enlem", "Boylam", "Derinlik", "Buyukluk", "Yer"];

/// Error type for catalog IO and parsing.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("missing required column '{name}'")]
    MissingColumn { name: &'static str },
    #[error("invalid timestamp '{value}'")]
    Timestamp { value: String },
    #[error("invalid numeric value '{value}' in column '{column}'")]
    Number {
        column: &'static str,
        value: String,
    },
}

/// In-memory event catalog, kept sorted ascending by timestamp.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<CatalogEvent>,
}

impl EventCatalog {
    /// Builds a catalog from events in any order; sorts them ascending by
    /// timestamp (stable, so same-instant events keep their input order).
    #[must_use]
    pub fn from_events(mut events: Vec<CatalogEvent>) -> Self {
        events.sort_by_key(|event| event.timestamp);
        Self { events }
    }

    /// Loads the resolved catalog from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a required column is
    /// missing, or a row fails to parse.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let catalog = Self::from_csv_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} catalog events from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses the resolved catalog from any reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a required column is missing or a row fails to
    /// parse.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let ts_idx = column_index(&headers, CATALOG_HEADERS[0])?;
        let location_idx = column_index(&headers, CATALOG_HEADERS[1])?;
        let magnitude_idx = column_index(&headers, CATALOG_HEADERS[2])?;

        let mut events = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let timestamp = parse_timestamp(field(&record, ts_idx), TIMESTAMP_FORMAT)?;
            let location = field(&record, location_idx).to_owned();
            let magnitude = parse_number(field(&record, magnitude_idx), CATALOG_HEADERS[2])?;
            events.push(CatalogEvent::new(timestamp, location, magnitude));
        }

        Ok(Self::from_events(events))
    }

    /// Writes the resolved catalog to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))?;
        log::info!("Wrote {} catalog events to {}", self.len(), path.display());
        Ok(())
    }

    /// Writes the resolved catalog to any writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(CATALOG_HEADERS)?;
        for event in &self.events {
            csv_writer.write_record([
                event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                event.location.clone(),
                event.magnitude.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Returns the number of events in the catalog.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the catalog holds no events.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns all events, ascending by timestamp.
    #[must_use]
    pub fn events(&self) -> &[CatalogEvent] {
        &self.events
    }

    /// Consumes the catalog, returning its events ascending by timestamp.
    #[must_use]
    pub fn into_events(self) -> Vec<CatalogEvent> {
        self.events
    }

    /// Returns the distinct location labels, sorted.
    #[must_use]
    pub fn locations(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.events.iter().map(|e| e.location.clone()).collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Returns the most recent `n` events for a location, ascending by
    /// timestamp (the tail of that location's history).
    #[must_use]
    pub fn recent_for_location(&self, location: &str, n: usize) -> Vec<&CatalogEvent> {
        let matching: Vec<&CatalogEvent> = self
            .events
            .iter()
            .filter(|e| e.location == location)
            .collect();
        let skip = matching.len().saturating_sub(n);
        matching.into_iter().skip(skip).collect()
    }

    /// Returns the `n` largest events by magnitude, ties broken by recency.
    #[must_use]
    pub fn largest(&self, n: usize) -> Vec<&CatalogEvent> {
        let mut sorted: Vec<&CatalogEvent> = self.events.iter().collect();
        sorted.sort_by(|a, b| {
            b.magnitude
                .total_cmp(&a.magnitude)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        sorted.truncate(n);
        sorted
    }

    /// Returns the `n` largest events for a single location.
    #[must_use]
    pub fn largest_for_location(&self, location: &str, n: usize) -> Vec<&CatalogEvent> {
        let mut sorted: Vec<&CatalogEvent> = self
            .events
            .iter()
            .filter(|e| e.location == location)
            .collect();
        sorted.sort_by(|a, b| {
            b.magnitude
                .total_cmp(&a.magnitude)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        sorted.truncate(n);
        sorted
    }
}

/// Loads the raw bulletin file, newest first as stored on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a required column is
/// missing, or a row fails to parse.
pub fn load_raw_csv(path: impl AsRef<Path>) -> Result<Vec<RawEvent>, CatalogError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let events = raw_from_reader(BufReader::new(file))?;
    log::info!("Loaded {} raw events from {}", events.len(), path.display());
    Ok(events)
}

/// Parses the raw bulletin file from any reader.
///
/// # Errors
///
/// Returns an error if a required column is missing or a row fails to parse.
pub fn raw_from_reader<R: Read>(reader: R) -> Result<Vec<RawEvent>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let ts_idx = column_index(&headers, RAW_HEADERS[0])?;
    let lat_idx = column_index(&headers, RAW_HEADERS[1])?;
    let lon_idx = column_index(&headers, RAW_HEADERS[2])?;
    let depth_idx = column_index(&headers, RAW_HEADERS[3])?;
    let magnitude_idx = column_index(&headers, RAW_HEADERS[4])?;
    let place_idx = column_index(&headers, RAW_HEADERS[5])?;

    let mut events = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        events.push(RawEvent {
            timestamp: parse_timestamp(field(&record, ts_idx), RAW_TIMESTAMP_FORMAT)?,
            latitude: parse_number(field(&record, lat_idx), RAW_HEADERS[1])?,
            longitude: parse_number(field(&record, lon_idx), RAW_HEADERS[2])?,
            depth_km: parse_number(field(&record, depth_idx), RAW_HEADERS[3])?,
            magnitude: parse_number(field(&record, magnitude_idx), RAW_HEADERS[4])?,
            place: field(&record, place_idx).to_owned(),
        });
    }

    Ok(events)
}

/// Writes the raw bulletin file, preserving the given order.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_raw_csv(path: impl AsRef<Path>, events: &[RawEvent]) -> Result<(), CatalogError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    raw_to_writer(BufWriter::new(file), events)?;
    log::info!("Wrote {} raw events to {}", events.len(), path.display());
    Ok(())
}

/// Writes raw bulletin events to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn raw_to_writer<W: Write>(writer: W, events: &[RawEvent]) -> Result<(), CatalogError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(RAW_HEADERS)?;
    for event in events {
        csv_writer.write_record([
            event.timestamp.format(RAW_TIMESTAMP_FORMAT).to_string(),
            event.latitude.to_string(),
            event.longitude.to_string(),
            event.depth_km.to_string(),
            event.magnitude.to_string(),
            event.place.clone(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Merges freshly fetched raw events into an existing set, deduplicating on
/// `(timestamp, latitude, longitude)`. Returns the merged list newest first
/// and the number of events that were actually new.
#[must_use]
pub fn merge_raw(existing: Vec<RawEvent>, fetched: Vec<RawEvent>) -> (Vec<RawEvent>, usize) {
    use std::collections::HashSet;

    let mut seen: HashSet<(i64, u64, u64)> = existing.iter().map(raw_key).collect();
    let mut merged = existing;
    let mut added = 0;

    for event in fetched {
        if seen.insert(raw_key(&event)) {
            merged.push(event);
            added += 1;
        }
    }

    merged.sort_by_key(|event| std::cmp::Reverse(event.timestamp));
    (merged, added)
}

fn raw_key(event: &RawEvent) -> (i64, u64, u64) {
    (
        event.timestamp.timestamp(),
        event.latitude.to_bits(),
        event.longitude.to_bits(),
    )
}

fn column_index(headers: &csv::StringRecord, name: &'static str) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or(CatalogError::MissingColumn { name })
}

fn field(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

fn parse_timestamp(value: &str, format: &str) -> Result<chrono::DateTime<chrono::Utc>, CatalogError> {
    NaiveDateTime::parse_from_str(value, format)
        .map(|naive| naive.and_utc())
        .map_err(|_| CatalogError::Timestamp {
            value: value.to_owned(),
        })
}

fn parse_number(value: &str, column: &'static str) -> Result<f64, CatalogError> {
    value.parse().map_err(|_| CatalogError::Number {
        column,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Utc};

    fn event(ts: &str, location: &str, magnitude: f64) -> CatalogEvent {
        CatalogEvent::new(
            NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
                .unwrap()
                .and_utc(),
            location.to_string(),
            magnitude,
        )
    }

    #[test]
    fn csv_roundtrip_preserves_events() {
        let catalog = EventCatalog::from_events(vec![
            event("2024-01-01 00:00:00", "IZMIR", 4.1),
            event("2024-01-02 12:30:00", "VAN", 3.2),
        ]);

        let mut buffer = Vec::new();
        catalog.write_csv(&mut buffer).unwrap();
        let reloaded = EventCatalog::from_csv_reader(buffer.as_slice()).unwrap();

        assert_eq!(reloaded.events(), catalog.events());
    }

    #[test]
    fn from_events_sorts_ascending() {
        let catalog = EventCatalog::from_events(vec![
            event("2024-03-01 00:00:00", "VAN", 3.0),
            event("2024-01-01 00:00:00", "VAN", 4.0),
            event("2024-02-01 00:00:00", "VAN", 5.0),
        ]);
        let magnitudes: Vec<f64> = catalog.events().iter().map(|e| e.magnitude).collect();
        assert_eq!(magnitudes, vec![4.0, 5.0, 3.0]);
    }

    #[test]
    fn largest_orders_by_magnitude_then_recency() {
        let catalog = EventCatalog::from_events(vec![
            event("2024-01-01 00:00:00", "VAN", 4.0),
            event("2024-01-02 00:00:00", "IZMIR", 5.5),
            event("2024-01-03 00:00:00", "MUGLA", 4.0),
            event("2024-01-04 00:00:00", "DENIZLI", 2.1),
        ]);

        let top = catalog.largest(3);
        assert_eq!(top[0].location, "IZMIR");
        // 4.0 tie resolves to the more recent event.
        assert_eq!(top[1].location, "MUGLA");
        assert_eq!(top[2].location, "VAN");
    }

    #[test]
    fn largest_for_location_filters_first() {
        let catalog = EventCatalog::from_events(vec![
            event("2024-01-01 00:00:00", "VAN", 4.0),
            event("2024-01-02 00:00:00", "IZMIR", 5.5),
            event("2024-01-03 00:00:00", "VAN", 3.1),
        ]);

        let top = catalog.largest_for_location("VAN", 5);
        assert_eq!(top.len(), 2);
        assert!((top[0].magnitude - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recent_for_location_returns_ascending_tail() {
        let events: Vec<CatalogEvent> = (1..=5)
            .map(|day| event(&format!("2024-01-0{day} 00:00:00"), "VAN", f64::from(day)))
            .collect();
        let catalog = EventCatalog::from_events(events);

        let tail = catalog.recent_for_location("VAN", 3);
        let magnitudes: Vec<f64> = tail.iter().map(|e| e.magnitude).collect();
        assert_eq!(magnitudes, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn locations_are_distinct_and_sorted() {
        let catalog = EventCatalog::from_events(vec![
            event("2024-01-01 00:00:00", "VAN", 4.0),
            event("2024-01-02 00:00:00", "IZMIR", 5.5),
            event("2024-01-03 00:00:00", "VAN", 3.1),
        ]);
        assert_eq!(catalog.locations(), vec!["IZMIR", "VAN"]);
    }

    #[test]
    fn missing_column_is_reported() {
        let data = "Tarih_Saat,Buyukluk\n2024-01-01 00:00:00,4.0\n";
        let err = EventCatalog::from_csv_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingColumn { name: "Konum" }
        ));
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let data = "Tarih_Saat,Konum,Buyukluk\nnot-a-date,VAN,4.0\n";
        let err = EventCatalog::from_csv_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Timestamp { .. }));
    }

    #[test]
    fn merge_raw_dedupes_and_sorts_newest_first() {
        let raw = |ts: &str, lat: f64, magnitude: f64| RawEvent {
            timestamp: NaiveDateTime::parse_from_str(ts, RAW_TIMESTAMP_FORMAT)
                .unwrap()
                .and_utc(),
            latitude: lat,
            longitude: 27.0,
            depth_km: 7.0,
            magnitude,
            place: "EGE DENIZI".to_string(),
        };

        let existing = vec![raw("2024.01.02 00:00:00", 38.0, 3.0)];
        let fetched = vec![
            raw("2024.01.02 00:00:00", 38.0, 3.0),
            raw("2024.01.03 00:00:00", 38.5, 4.2),
            raw("2024.01.01 00:00:00", 39.0, 2.5),
        ];

        let (merged, added) = merge_raw(existing, fetched);
        assert_eq!(added, 2);
        assert_eq!(merged.len(), 3);
        assert!((merged[0].magnitude - 4.2).abs() < f64::EPSILON);
        assert!((merged[2].magnitude - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn raw_csv_roundtrip() {
        let events = vec![RawEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            latitude: 38.4237,
            longitude: 27.1428,
            depth_km: 9.3,
            magnitude: 4.6,
            place: "IZMIR KORFEZI (EGE DENIZI)".to_string(),
        }];

        let mut buffer = Vec::new();
        raw_to_writer(&mut buffer, &events).unwrap();
        let reloaded = raw_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(reloaded, events);
    }
}
