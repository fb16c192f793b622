//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use agile_replay::error::RateKind;
use agile_replay::sim::types::{ConsumptionInterval, SimulationConfig};
use agile_replay::tariff::RateTable;

/// Midnight on a March day, when UK local time equals UTC.
pub fn march_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0)
        .single()
        .expect("valid instant")
}

/// Start of the `i`-th half hour after `start`.
pub fn slot(start: DateTime<Utc>, i: usize) -> DateTime<Utc> {
    start + TimeDelta::minutes(30 * i as i64)
}

/// `n` intervals from `start` with consumption given per slot index.
pub fn intervals(
    start: DateTime<Utc>,
    n: usize,
    usage: impl Fn(usize) -> f64,
) -> Vec<ConsumptionInterval> {
    (0..n)
        .map(|i| ConsumptionInterval {
            timestamp: slot(start, i),
            consumption_kwh: usage(i),
        })
        .collect()
}

/// A rate table over `n` half hours with the rate given per slot index.
pub fn rates(
    kind: RateKind,
    start: DateTime<Utc>,
    n: usize,
    rate: impl Fn(usize) -> f64,
) -> RateTable {
    RateTable::new(kind, (0..n).map(|i| (slot(start, i), rate(i))))
}

/// Default configuration with a custom battery and no solar.
pub fn battery_config(capacity_kwh: f64, inverter_limit_kw: f64) -> SimulationConfig {
    SimulationConfig {
        battery_capacity_kwh: capacity_kwh,
        inverter_limit_kw,
        annual_solar_output_kwh: 0.0,
        ..SimulationConfig::default()
    }
}

/// A scratch directory unique to one test.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("agile-replay-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}
