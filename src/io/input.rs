//! JSON loaders for meter readings and agile rates.
//!
//! Accepts either a bare array of records or a page object with a `results`
//! array, which is how the retrieval cache stores API responses.

use std::fs;
use std::ops::Range;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{RateKind, Result, SimError};
use crate::sim::clock::Clock;
use crate::sim::types::ConsumptionInterval;
use crate::tariff::RateTable;

/// One half-hour meter reading.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumptionRecord {
    pub interval_start: DateTime<Utc>,
    pub consumption: f64,
}

/// One agile price, inclusive of VAT.
#[derive(Debug, Clone, Deserialize)]
pub struct RateRecord {
    pub valid_from: DateTime<Utc>,
    pub value_inc_vat: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Records<T> {
    Page { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Records<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page { results } => results,
            Self::Bare(records) => records,
        }
    }
}

/// Parses records from JSON text.
///
/// # Errors
///
/// Returns the `serde_json` error when the text is neither shape.
pub fn parse_records<T: DeserializeOwned>(text: &str) -> serde_json::Result<Vec<T>> {
    serde_json::from_str::<Records<T>>(text).map(Records::into_vec)
}

/// Reads and parses a JSON records file.
///
/// # Errors
///
/// Returns [`SimError::Io`] or [`SimError::Parse`] naming the file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&text).map_err(|source| SimError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Sorts readings ascending, drops duplicate timestamps and keeps those in `range`.
pub fn prepare_consumption(
    records: Vec<ConsumptionRecord>,
    range: Option<&Range<DateTime<Utc>>>,
) -> Vec<ConsumptionInterval> {
    let mut intervals: Vec<ConsumptionInterval> = records
        .into_iter()
        .filter(|r| range.is_none_or(|range| range.contains(&r.interval_start)))
        .map(|r| ConsumptionInterval {
            timestamp: r.interval_start,
            consumption_kwh: r.consumption.max(0.0),
        })
        .collect();
    intervals.sort_by_key(|i| i.timestamp);
    intervals.dedup_by_key(|i| i.timestamp);
    intervals
}

/// Builds a rate table from price records.
pub fn rate_table(kind: RateKind, records: Vec<RateRecord>) -> RateTable {
    RateTable::new(
        kind,
        records.into_iter().map(|r| (r.valid_from, r.value_inc_vat)),
    )
}

/// Loads meter readings from a JSON file.
///
/// # Errors
///
/// Returns [`SimError::EmptyInput`] when no reading falls in `range`, or the
/// file's I/O or parse error.
pub fn load_consumption(
    path: &Path,
    range: Option<&Range<DateTime<Utc>>>,
) -> Result<Vec<ConsumptionInterval>> {
    let intervals = prepare_consumption(read_records(path)?, range);
    if intervals.is_empty() {
        return Err(SimError::EmptyInput("consumption"));
    }
    tracing::info!(path = %path.display(), intervals = intervals.len(), "loaded consumption");
    Ok(intervals)
}

/// Loads an agile rate table from a JSON file.
///
/// # Errors
///
/// Returns [`SimError::EmptyInput`] when the file holds no rates, or the
/// file's I/O or parse error.
pub fn load_rates(path: &Path, kind: RateKind) -> Result<RateTable> {
    let table = rate_table(kind, read_records(path)?);
    if table.is_empty() {
        return Err(SimError::EmptyInput(match kind {
            RateKind::Import => "agile import rate",
            RateKind::Export => "agile export rate",
        }));
    }
    tracing::info!(path = %path.display(), rates = table.len(), table = %kind, "loaded rates");
    Ok(table)
}

/// Counts half hours missing between the first and last reading and logs a warning.
pub fn warn_on_gaps(intervals: &[ConsumptionInterval]) -> usize {
    let (Some(first), Some(last)) = (intervals.first(), intervals.last()) else {
        return 0;
    };
    let expected = Clock::new(first.timestamp, last.timestamp + Clock::step()).remaining();
    let missing = expected.saturating_sub(intervals.len());
    if missing > 0 {
        tracing::warn!(
            missing,
            from = %first.timestamp,
            to = %last.timestamp,
            "consumption data has missing half hours"
        );
    }
    missing
}
