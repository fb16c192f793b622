//! Time-series points for the results sink.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sim::types::{IntervalLedgerEntry, SimulationConfig};
use crate::tariff::RateBand;

/// Default series name for replayed intervals.
pub const DEFAULT_SERIES: &str = "solar_electricity";

/// One sink point: a named series, an instant, string tags and numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub measurement: String,
    pub time: DateTime<Utc>,
    pub tags: BTreeMap<&'static str, String>,
    pub fields: BTreeMap<&'static str, f64>,
}

impl Point {
    /// Builds the point of one ledger entry.
    pub fn from_entry(series: &str, entry: &IntervalLedgerEntry, config: &SimulationConfig) -> Self {
        let band = RateBand::for_hour(entry.time_of_day.hour());
        let tags = BTreeMap::from([
            ("time_of_day", entry.time_of_day.to_string()),
            ("active_rate", band.label().to_string()),
        ]);
        let fields = BTreeMap::from([
            ("consumption", entry.grid_consumption_kwh),
            ("agile_rate", entry.import_rate),
            ("agile_export_rate", entry.export_rate),
            ("agile_cost", entry.agile_cost),
            ("flux_rate", entry.flux_rate_applied),
            ("flux_cost", entry.flux_cost),
            (
                "total_cost",
                entry.agile_cost + config.standing_charge_per_interval(),
            ),
            ("battery_charge", entry.battery_charge_after),
            ("solar_generation", entry.solar_generated_kwh),
            ("solar_export", entry.solar_exported_kwh),
            ("actual_usage", entry.raw_usage_kwh),
        ]);
        Self {
            measurement: series.to_string(),
            time: entry.timestamp,
            tags,
            fields,
        }
    }
}

/// One point per ledger entry, in ledger order.
pub fn ledger_points(
    series: &str,
    ledger: &[IntervalLedgerEntry],
    config: &SimulationConfig,
) -> Vec<Point> {
    ledger
        .iter()
        .map(|entry| Point::from_entry(series, entry, config))
        .collect()
}

/// Writes points as a JSON array.
///
/// # Errors
///
/// Returns an `io::Error` if serialisation or writing fails.
pub fn write_points(points: &[Point], writer: impl Write) -> io::Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, points)?;
    writer.flush()
}

/// Writes points to a JSON file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_points(points: &[Point], path: &Path) -> io::Result<()> {
    write_points(points, File::create(path)?)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;
    use crate::sim::types::MinuteOfDay;

    fn entry() -> IntervalLedgerEntry {
        IntervalLedgerEntry {
            timestamp: Utc
                .with_ymd_and_hms(2024, 1, 10, 17, 0, 0)
                .single()
                .expect("valid instant"),
            time_of_day: MinuteOfDay::from_hm(17, 0).expect("valid time"),
            grid_consumption_kwh: 0.8,
            grid_charge_kwh: 0.0,
            battery_discharged_kwh: 0.0,
            import_rate: 35.0,
            export_rate: 15.0,
            agile_cost: 28.0,
            flux_rate_applied: 39.34,
            flux_cost: 31.472,
            battery_charge_after: 0.0,
            solar_generated_kwh: 0.0,
            solar_exported_kwh: 0.0,
            raw_usage_kwh: 0.8,
            charging_from_grid: false,
        }
    }

    #[test]
    fn point_carries_tags_and_fields() {
        let config = SimulationConfig::default();
        let point = Point::from_entry(DEFAULT_SERIES, &entry(), &config);
        assert_eq!(point.measurement, "solar_electricity");
        assert_eq!(point.tags["time_of_day"], "17:00");
        assert_eq!(point.tags["active_rate"], "peak");
        assert_eq!(point.fields.len(), 11);
        assert_abs_diff_eq!(
            point.fields["total_cost"],
            28.0 + config.standing_charge_per_day / 48.0
        );
    }

    #[test]
    fn points_serialise_as_json_array() {
        let config = SimulationConfig::default();
        let points = ledger_points("test", &[entry(), entry()], &config);
        let mut buf = Vec::new();
        write_points(&points, &mut buf).expect("write");

        let value: serde_json::Value = serde_json::from_slice(&buf).expect("valid json");
        let array = value.as_array().expect("array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["measurement"], "test");
        assert_eq!(array[0]["fields"]["actual_usage"], 0.8);
    }
}
