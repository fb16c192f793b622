//! Replays read from JSON input files through a TOML scenario.

mod common;

use std::path::Path;

use approx::assert_abs_diff_eq;
use serde_json::{Value, json};

use agile_replay::config::ScenarioConfig;
use agile_replay::error::SimError;
use agile_replay::runner::run_scenario;

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string(value).expect("serialisable")).expect("writable");
}

/// One March day of readings, as an API page, skipping the listed slots.
fn consumption_page(skip: &[usize]) -> Value {
    let start = common::march_day();
    let results: Vec<Value> = (0..48)
        .filter(|i| !skip.contains(i))
        .map(|i| {
            json!({
                "interval_start": common::slot(start, i).to_rfc3339(),
                "interval_end": common::slot(start, i + 1).to_rfc3339(),
                "consumption": 0.5,
            })
        })
        .collect();
    json!({ "count": results.len(), "results": results })
}

fn rates(value: f64) -> Value {
    let start = common::march_day();
    Value::Array(
        (0..48)
            .map(|i| {
                json!({
                    "valid_from": common::slot(start, i).to_rfc3339(),
                    "value_inc_vat": value,
                })
            })
            .collect(),
    )
}

fn write_scenario(dir: &Path, extra: &str) -> ScenarioConfig {
    let toml = format!(
        r#"
[battery]
capacity_kwh = 0.0

[period]
from = "2024-03-04"
to = "2024-03-05"

[inputs]
consumption = "usage.json"
import_rates = "agile.json"
export_rates = "outgoing.json"
{extra}
"#
    );
    let path = dir.join("scenario.toml");
    std::fs::write(&path, toml).expect("writable");
    ScenarioConfig::from_toml_file(&path).expect("valid scenario")
}

#[test]
fn replays_file_inputs_and_counts_gaps() {
    let dir = common::scratch_dir("file-inputs");
    write_json(&dir.join("usage.json"), &consumption_page(&[10, 11]));
    write_json(&dir.join("agile.json"), &rates(20.0));
    write_json(&dir.join("outgoing.json"), &json!({ "results": rates(5.0) }));

    let scenario = write_scenario(&dir, "");
    assert!(!scenario.is_synthetic());

    let outcome = run_scenario(&scenario).expect("complete run");
    assert_eq!(outcome.output.ledger.len(), 46);
    assert_eq!(outcome.missing_intervals, 2);
    assert_abs_diff_eq!(outcome.report.totals.consumption_kwh, 23.0, epsilon = 1e-9);
    assert_abs_diff_eq!(outcome.report.totals.agile_cost, 23.0 * 20.0, epsilon = 1e-9);
}

#[test]
fn previous_product_prices_intervals_before_the_switchover() {
    let dir = common::scratch_dir("switchover");
    write_json(&dir.join("usage.json"), &consumption_page(&[]));
    write_json(&dir.join("agile_v1.json"), &rates(10.0));
    write_json(&dir.join("agile.json"), &rates(30.0));
    write_json(&dir.join("outgoing.json"), &rates(5.0));

    let scenario = write_scenario(
        &dir,
        "previous_import_rates = \"agile_v1.json\"\n\n[tariff]\nimport_switchover = \"2024-03-04T12:00:00Z\"",
    );
    let outcome = run_scenario(&scenario).expect("complete run");

    let ledger = &outcome.output.ledger;
    assert_eq!(ledger[23].import_rate, 10.0);
    assert_eq!(ledger[24].import_rate, 30.0);
    assert_abs_diff_eq!(
        outcome.report.totals.agile_cost,
        24.0 * 0.5 * 10.0 + 24.0 * 0.5 * 30.0,
        epsilon = 1e-9
    );
}

#[test]
fn short_rate_file_is_a_data_gap() {
    let dir = common::scratch_dir("short-rates");
    write_json(&dir.join("usage.json"), &consumption_page(&[]));
    let mut short = rates(20.0);
    if let Value::Array(records) = &mut short {
        records.truncate(40);
    }
    write_json(&dir.join("agile.json"), &short);
    write_json(&dir.join("outgoing.json"), &rates(5.0));

    let scenario = write_scenario(&dir, "");
    assert!(matches!(
        run_scenario(&scenario),
        Err(SimError::DataGap { .. })
    ));
}

#[test]
fn malformed_json_names_the_file() {
    let dir = common::scratch_dir("malformed");
    std::fs::write(dir.join("usage.json"), "{ not json").expect("writable");
    write_json(&dir.join("agile.json"), &rates(20.0));
    write_json(&dir.join("outgoing.json"), &rates(5.0));

    let scenario = write_scenario(&dir, "");
    match run_scenario(&scenario) {
        Err(SimError::Parse { path, .. }) => assert!(path.ends_with("usage.json")),
        other => panic!("expected a parse error, got {other:?}"),
    }
}
