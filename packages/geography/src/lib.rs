#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Epicenter-to-province resolution.
//!
//! Builds an in-memory index of province bounding boxes once at startup and
//! answers point lookups for every raw bulletin event. A point matches a
//! province when it falls inside the box padded by
//! [`BOUNDS_PADDING_DEGREES`]; among the matches the nearest box center
//! wins, so offshore epicenters still attribute to the closest coastal
//! province. Points outside every padded box resolve to
//! [`UNKNOWN_PROVINCE`].

use std::path::Path;

use quakecast_catalog_models::{CatalogEvent, RawEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod provinces;

/// Label assigned to events whose epicenter matches no province box.
pub const UNKNOWN_PROVINCE: &str = "BELIRSIZ";

/// Margin added to every box during containment checks, in degrees.
pub const BOUNDS_PADDING_DEGREES: f64 = 1.4;

/// Errors that can occur while building a province index.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// Reading the bounds file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bounds file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bounds file parsed but defines no provinces.
    #[error("province bounds define no provinces")]
    Empty,
}

/// Axis-aligned bounding box of one province, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProvinceBounds {
    /// Southern edge.
    pub lat_min: f64,
    /// Northern edge.
    pub lat_max: f64,
    /// Western edge.
    pub lon_min: f64,
    /// Eastern edge.
    pub lon_max: f64,
}

impl ProvinceBounds {
    /// Returns `true` if the point lies inside the box grown by `padding`
    /// degrees on every side.
    #[must_use]
    pub const fn contains_padded(&self, latitude: f64, longitude: f64, padding: f64) -> bool {
        latitude >= self.lat_min - padding
            && latitude <= self.lat_max + padding
            && longitude >= self.lon_min - padding
            && longitude <= self.lon_max + padding
    }

    /// Returns the `(latitude, longitude)` center of the box.
    #[must_use]
    pub const fn center(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }
}

/// One province in the index with its precomputed center.
#[derive(Debug, Clone)]
struct ProvinceEntry {
    name: String,
    bounds: ProvinceBounds,
    center_lat: f64,
    center_lon: f64,
}

/// Pre-built province lookup index.
///
/// Constructed once and shared across all consumers; lookups never mutate.
#[derive(Debug, Clone)]
pub struct ProvinceIndex {
    provinces: Vec<ProvinceEntry>,
}

impl ProvinceIndex {
    /// Builds the index from the built-in province table.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_bounds(
            provinces::PROVINCE_BOUNDS
                .iter()
                .map(|(name, bounds)| ((*name).to_owned(), *bounds)),
        )
    }

    /// Loads province bounds from a JSON file mapping province name to
    /// bounding box.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// defines no provinces.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeographyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let index = Self::from_json_str(&contents)?;
        log::info!(
            "Loaded {} province bounds from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Parses province bounds from a JSON string mapping province name to
    /// bounding box.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or defines no provinces.
    pub fn from_json_str(json: &str) -> Result<Self, GeographyError> {
        let map: std::collections::BTreeMap<String, ProvinceBounds> = serde_json::from_str(json)?;
        if map.is_empty() {
            return Err(GeographyError::Empty);
        }
        Ok(Self::from_bounds(map))
    }

    fn from_bounds(bounds: impl IntoIterator<Item = (String, ProvinceBounds)>) -> Self {
        let provinces = bounds
            .into_iter()
            .map(|(name, bounds)| {
                let (center_lat, center_lon) = bounds.center();
                ProvinceEntry {
                    name,
                    bounds,
                    center_lat,
                    center_lon,
                }
            })
            .collect();
        Self { provinces }
    }

    /// Returns the number of provinces in the index.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.provinces.len()
    }

    /// Returns `true` if the index holds no provinces.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.provinces.is_empty()
    }

    /// Resolves a point to a province name.
    ///
    /// Every province whose padded box contains the point is a candidate;
    /// the one with the nearest box center wins. Returns
    /// [`UNKNOWN_PROVINCE`] when no box matches.
    #[must_use]
    pub fn resolve(&self, latitude: f64, longitude: f64) -> &str {
        let mut best: Option<(&str, f64)> = None;

        for province in &self.provinces {
            if !province
                .bounds
                .contains_padded(latitude, longitude, BOUNDS_PADDING_DEGREES)
            {
                continue;
            }
            let distance = (latitude - province.center_lat).hypot(longitude - province.center_lon);
            match best {
                None => best = Some((&province.name, distance)),
                Some((_, current)) if distance < current => {
                    best = Some((&province.name, distance));
                }
                _ => {}
            }
        }

        best.map_or(UNKNOWN_PROVINCE, |(name, _)| name)
    }

    /// Resolves every raw event to a catalog event with a province label.
    #[must_use]
    pub fn resolve_events(&self, raw: &[RawEvent]) -> Vec<CatalogEvent> {
        let mut unknown = 0usize;
        let events = raw
            .iter()
            .map(|event| {
                let location = self.resolve(event.latitude, event.longitude);
                if location == UNKNOWN_PROVINCE {
                    unknown += 1;
                }
                CatalogEvent::new(event.timestamp, location.to_owned(), event.magnitude)
            })
            .collect();

        if unknown > 0 {
            log::debug!("{unknown} of {} events resolved to no province", raw.len());
        }
        events
    }
}
