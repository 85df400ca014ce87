#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Observatory bulletin fetcher for the earthquake catalog.
//!
//! The Kandilli observatory publishes recent events as a fixed-width plain
//! text page. This crate fetches that page (with retry and backoff),
//! parses the column-aligned lines into [`RawEvent`]s, and merges them
//! into the on-disk raw catalog in one batch.
//!
//! ## Bulletin line format
//!
//! After a fixed page header, each data line carries whitespace-separated
//! columns:
//!
//! ```text
//! date time latitude longitude depth MD ML Mw place... [quality flag]
//! ```
//!
//! The ML column is taken as the magnitude; `-.-` marks a missing value
//! and such lines are skipped. Everything from the ninth column on is the
//! free-text place description.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use quakecast_catalog::RAW_TIMESTAMP_FORMAT;
use quakecast_catalog_models::RawEvent;
use thiserror::Error;

pub mod progress;
pub mod retry;

use progress::ProgressCallback;

/// Default URL of the observatory bulletin page.
pub const KOERI_URL: &str = "http://www.koeri.boun.edu.tr/scripts/lst0.asp";

/// Number of page-header lines before the first data line.
const HEADER_LINES: usize = 6;

/// Minimum length of a column-aligned data line, in characters. Shorter
/// lines are page chrome or footer text.
const MIN_LINE_CHARS: usize = 120;

/// Errors that can occur while fetching or storing bulletin data.
#[derive(Debug, Error)]
pub enum BulletinError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing the raw catalog file failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] quakecast_catalog::CatalogError),

    /// The response arrived but could not be used.
    #[error("Bulletin error: {message}")]
    Bulletin {
        /// Description of what went wrong.
        message: String,
    },
}

/// Configuration for a bulletin fetcher.
#[derive(Debug, Clone)]
pub struct BulletinConfig {
    /// URL of the plain-text bulletin page.
    pub url: String,
    /// Label for log messages.
    pub label: String,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            url: KOERI_URL.to_owned(),
            label: "KOERI".to_owned(),
        }
    }
}

/// Outcome of parsing one bulletin page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBulletin {
    /// Events parsed from the page, newest first as published.
    pub events: Vec<RawEvent>,
    /// Number of data-length lines that failed to parse.
    pub skipped: usize,
}

/// Parses the bulletin page text into raw events.
///
/// Skips the fixed page header, ignores lines too short to be data, and
/// counts (but tolerates) malformed data lines.
#[must_use]
pub fn parse_bulletin(text: &str) -> ParsedBulletin {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines().skip(HEADER_LINES) {
        if line.trim().is_empty() || line.chars().count() <= MIN_LINE_CHARS {
            continue;
        }
        match parse_line(line) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    ParsedBulletin { events, skipped }
}

/// Parses one column-aligned bulletin line, or `None` if any field is
/// missing or malformed.
fn parse_line(line: &str) -> Option<RawEvent> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }

    let timestamp = NaiveDateTime::parse_from_str(
        &format!("{} {}", parts[0], parts[1]),
        RAW_TIMESTAMP_FORMAT,
    )
    .ok()?
    .and_utc();

    Some(RawEvent {
        timestamp,
        latitude: parts[2].parse().ok()?,
        longitude: parts[3].parse().ok()?,
        depth_km: parts[4].parse().ok()?,
        // ML column; "-.-" (missing) fails the parse and skips the line.
        magnitude: parts[6].parse().ok()?,
        place: parts[8..].join(" "),
    })
}

/// HTTP client for the observatory bulletin page.
pub struct BulletinClient {
    config: BulletinConfig,
    client: reqwest::Client,
}

impl BulletinClient {
    /// Creates a client with browser-like headers and generous timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: BulletinConfig) -> Result<Self, BulletinError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36")
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    /// Returns the label used in log messages.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Fetches the bulletin page and parses it into raw events, newest
    /// first. `limit` caps the number of returned events.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched after retries.
    #[allow(clippy::future_not_send)]
    pub async fn fetch_raw_events(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<RawEvent>, BulletinError> {
        log::info!(
            "{}: fetching bulletin page at {}",
            self.config.label,
            self.config.url,
        );

        let text = retry::send_text(|| self.client.get(&self.config.url)).await?;
        let mut parsed = parse_bulletin(&text);

        log::info!(
            "{}: parsed {} events ({} malformed lines skipped)",
            self.config.label,
            parsed.events.len(),
            parsed.skipped,
        );
        if parsed.events.is_empty() {
            log::warn!(
                "{}: no events parsed from bulletin page, format may have changed",
                self.config.label,
            );
        }

        if let Some(limit) = limit
            && parsed.events.len() > limit
        {
            log::info!("{}: limiting to {limit} events", self.config.label);
            parsed.events.truncate(limit);
        }

        Ok(parsed.events)
    }
}

/// Outcome of one bulletin sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Total events in the raw catalog after the merge.
    pub total: usize,
    /// Events that were new in this sync.
    pub added: usize,
}

/// Fetches the bulletin and merges new events into the raw catalog file.
///
/// Existing events are kept; fetched events are deduplicated against them
/// on `(timestamp, latitude, longitude)` and the merged file is written
/// newest first.
///
/// # Errors
///
/// Returns an error if the fetch fails or the raw catalog file cannot be
/// read or written.
#[allow(clippy::future_not_send)]
pub async fn sync(
    client: &BulletinClient,
    raw_path: impl AsRef<Path>,
    limit: Option<usize>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<SyncOutcome, BulletinError> {
    let raw_path = raw_path.as_ref();

    progress.set_message(format!("{}: fetching bulletin page", client.label()));
    let fetched = client.fetch_raw_events(limit).await?;
    progress.set_total(fetched.len() as u64);
    progress.set_position(fetched.len() as u64);

    let existing = if raw_path.exists() {
        quakecast_catalog::load_raw_csv(raw_path)?
    } else {
        Vec::new()
    };
    let existing_count = existing.len();

    let (merged, added) = quakecast_catalog::merge_raw(existing, fetched);
    quakecast_catalog::save_raw_csv(raw_path, &merged)?;

    log::info!(
        "{}: raw catalog now {} events ({existing_count} existing, {added} new)",
        client.label(),
        merged.len(),
    );
    progress.finish(format!(
        "{}: sync complete, {added} new events ({} total)",
        client.label(),
        merged.len(),
    ));

    Ok(SyncOutcome {
        total: merged.len(),
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulletin_line(ml: &str) -> String {
        format!(
            "2024.05.02 14:55:03  38.4120   27.1430        9.1      -.-  {ml}  -.-   {:<70}Ilksel",
            "IZMIR KORFEZI (EGE DENIZI)"
        )
    }

    fn page_with(lines: &[String]) -> String {
        let mut page = String::new();
        for _ in 0..6 {
            page.push_str("KOERI sayfa basligi\n");
        }
        for line in lines {
            page.push_str(line);
            page.push('\n');
        }
        page
    }

    #[test]
    fn parses_a_well_formed_line() {
        let page = page_with(&[bulletin_line("4.6")]);
        let parsed = parse_bulletin(&page);

        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.events.len(), 1);

        let event = &parsed.events[0];
        assert_eq!(
            event.timestamp.format("%Y.%m.%d %H:%M:%S").to_string(),
            "2024.05.02 14:55:03"
        );
        assert!((event.latitude - 38.412).abs() < f64::EPSILON);
        assert!((event.longitude - 27.143).abs() < f64::EPSILON);
        assert!((event.depth_km - 9.1).abs() < f64::EPSILON);
        assert!((event.magnitude - 4.6).abs() < f64::EPSILON);
        assert!(event.place.starts_with("IZMIR KORFEZI (EGE DENIZI)"));
    }

    #[test]
    fn missing_magnitude_skips_the_line() {
        let page = page_with(&[bulletin_line("-.-"), bulletin_line("3.2")]);
        let parsed = parse_bulletin(&page);

        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.events.len(), 1);
        assert!((parsed.events[0].magnitude - 3.2).abs() < f64::EPSILON);
    }

    #[test]
    fn short_lines_are_ignored_silently() {
        let page = page_with(&["Son 500 deprem".to_string()]);
        let parsed = parse_bulletin(&page);

        assert_eq!(parsed.skipped, 0);
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn header_lines_are_skipped_by_position() {
        // A parseable line inside the fixed header region must not count.
        let mut page = String::new();
        page.push_str(&bulletin_line("5.0"));
        page.push('\n');
        for _ in 0..5 {
            page.push_str("baslik\n");
        }
        page.push_str(&bulletin_line("4.0"));
        page.push('\n');

        let parsed = parse_bulletin(&page);
        assert_eq!(parsed.events.len(), 1);
        assert!((parsed.events[0].magnitude - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn place_joins_remaining_columns() {
        let line = format!(
            "2024.05.02 14:55:03  38.4120   27.1430        9.1      2.9  3.1  -.-   {:<70}REVIZE01",
            "SULUSARAY-TOKAT (GOL KENARI)"
        );
        let parsed = parse_bulletin(&page_with(&[line]));

        assert_eq!(parsed.events.len(), 1);
        assert_eq!(
            parsed.events[0].place,
            "SULUSARAY-TOKAT (GOL KENARI) REVIZE01"
        );
    }
}
