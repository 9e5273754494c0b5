//! CSV bar ingest.
//!
//! Expects a header row naming `timestamp, open, high, low, close, volume`
//! (case-insensitive, any order, extra columns ignored). The header is checked
//! before any row is read; the parsed series is validated before it is returned.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::domain::{validate_series, Bar};

use super::DataError;

pub const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Read and validate a bar series from any CSV source.
pub fn read_bars<R: Read>(source: R) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);

    let normalized: csv::StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !normalized.iter().any(|h| h == **col))
    {
        return Err(DataError::MissingColumn(missing.to_string()));
    }
    reader.set_headers(normalized);

    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
        let r = record?;
        let timestamp = parse_timestamp(&r.timestamp).ok_or_else(|| DataError::Timestamp {
            row,
            value: r.timestamp.clone(),
        })?;
        bars.push(Bar::new(timestamp, r.open, r.high, r.low, r.close, r.volume));
    }

    validate_series(&bars)?;
    debug!(bars = bars.len(), "loaded bar series");
    Ok(bars)
}

/// Read and validate a bar series from a CSV file.
pub fn read_bars_from_path(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let file = File::open(path.as_ref())?;
    read_bars(BufReader::new(file))
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, or a bare date.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
