//! Loads a scenario's inputs and replays them end to end.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::{ConfigError, ScenarioConfig};
use crate::error::{RateKind, Result, SimError};
use crate::io::input;
use crate::sim::engine::{SimulationEngine, SimulationOutput};
use crate::sim::kpi::RunReport;
use crate::sim::types::{ConsumptionInterval, SimulationConfig};
use crate::synthetic;
use crate::tariff::RateTable;

/// Consumption and agile rates ready for the engine.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub consumption: Vec<ConsumptionInterval>,
    pub import: RateTable,
    pub export: RateTable,
    /// Half hours missing from the consumption data.
    pub missing_intervals: usize,
}

/// Everything produced by one scenario run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub config: SimulationConfig,
    pub output: SimulationOutput,
    pub report: RunReport,
    pub missing_intervals: usize,
}

/// Reads the scenario's input files, or generates synthetic inputs when none are set.
///
/// # Errors
///
/// Returns any loader error, [`SimError::EmptyInput`] when nothing falls in the
/// period, or [`SimError::Configuration`] when a synthetic run has no period.
pub fn load_inputs(scenario: &ScenarioConfig, config: &SimulationConfig) -> Result<RunInputs> {
    let range = scenario.period_range(config.timezone);

    if scenario.is_synthetic() {
        let range = range
            .filter(|r| r.start > DateTime::<Utc>::MIN_UTC && r.end < DateTime::<Utc>::MAX_UTC)
            .ok_or_else(|| SimError::Configuration(scenario.validate()))?;
        let generated =
            synthetic::generate(&scenario.synthetic, config.timezone, range.start, range.end);
        return Ok(RunInputs {
            consumption: generated.consumption,
            import: generated.import,
            export: generated.export,
            missing_intervals: 0,
        });
    }

    let inputs = &scenario.inputs;
    let consumption = input::load_consumption(
        required(&inputs.consumption, "inputs.consumption")?,
        range.as_ref(),
    )?;
    let missing_intervals = input::warn_on_gaps(&consumption);

    let mut import = input::load_rates(
        required(&inputs.import_rates, "inputs.import_rates")?,
        RateKind::Import,
    )?;
    if let (Some(previous), Some(switch_at)) = (
        &inputs.previous_import_rates,
        scenario.tariff.import_switchover,
    ) {
        let earlier = input::load_rates(previous, RateKind::Import)?;
        import = RateTable::with_switchover(&earlier, &import, switch_at);
        tracing::info!(%switch_at, rates = import.len(), "combined import products");
    }
    let export = input::load_rates(
        required(&inputs.export_rates, "inputs.export_rates")?,
        RateKind::Export,
    )?;

    Ok(RunInputs {
        consumption,
        import,
        export,
        missing_intervals,
    })
}

fn required<'a>(path: &'a Option<PathBuf>, field: &str) -> Result<&'a Path> {
    path.as_deref().ok_or_else(|| {
        SimError::Configuration(vec![ConfigError {
            field: field.to_string(),
            message: "is required with file inputs".to_string(),
        }])
    })
}

/// Replays a scenario and computes its report.
///
/// # Errors
///
/// Returns the first configuration, input or replay error; no partial output
/// is produced.
pub fn run_scenario(scenario: &ScenarioConfig) -> Result<RunOutcome> {
    let config = scenario.simulation_config()?;
    let inputs = load_inputs(scenario, &config)?;
    run_with_inputs(config, &inputs)
}

/// Replays already loaded inputs.
///
/// # Errors
///
/// Returns [`SimError::EmptyInput`], [`SimError::DataGap`] or
/// [`SimError::OutOfOrder`] from the engine.
pub fn run_with_inputs(config: SimulationConfig, inputs: &RunInputs) -> Result<RunOutcome> {
    let output =
        SimulationEngine::new(&config, &inputs.import, &inputs.export).run(&inputs.consumption)?;
    let report = RunReport::from_output(&output, &config);
    tracing::info!(
        intervals = output.ledger.len(),
        days = output.days.len(),
        agile_cost = report.totals.agile_cost,
        flux_cost = report.totals.flux_cost,
        "replay complete"
    );
    Ok(RunOutcome {
        config,
        output,
        report,
        missing_intervals: inputs.missing_intervals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_runs_on_synthetic_inputs() {
        let outcome = run_scenario(&ScenarioConfig::baseline()).expect("baseline run");
        assert_eq!(outcome.output.ledger.len(), 14 * 48);
        assert_eq!(outcome.output.days.len(), 14);
        assert_eq!(outcome.report.totals.days, 14);
        assert!(outcome.report.totals.agile_cost.is_finite());
    }

    #[test]
    fn invalid_scenario_is_rejected_before_loading() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.battery.min_kwh = 100.0;
        assert!(matches!(
            run_scenario(&scenario),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn missing_input_file_is_an_io_error() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.inputs.consumption = Some("/nonexistent/usage.json".into());
        scenario.inputs.import_rates = Some("/nonexistent/agile.json".into());
        scenario.inputs.export_rates = Some("/nonexistent/export.json".into());
        assert!(matches!(run_scenario(&scenario), Err(SimError::Io { .. })));
    }
}
