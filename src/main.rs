//! agile-replay entry point: CLI wiring, logging and output files.

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agile_replay::cli::Cli;
use agile_replay::config::ScenarioConfig;
use agile_replay::io::export::export_csv;
use agile_replay::io::points::{export_points, ledger_points};
use agile_replay::reporting::{print_parameters, print_report};
use agile_replay::runner::{load_inputs, run_with_inputs};

/// Resolves the scenario: `--scenario` first, then `--preset`, then the baseline.
fn load_scenario(cli: &Cli) -> Result<ScenarioConfig> {
    let mut scenario = if let Some(path) = &cli.scenario {
        ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("loading scenario {}", path.display()))?
    } else if let Some(name) = &cli.preset {
        ScenarioConfig::from_preset(name)?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(from) = cli.from {
        scenario.period.from = Some(from);
    }
    if let Some(to) = cli.to {
        scenario.period.to = Some(to);
    }
    if let Some(seed) = cli.seed {
        scenario.synthetic.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("config error: {e}");
        }
        bail!("invalid scenario ({} errors)", errors.len());
    }
    Ok(scenario)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let scenario = load_scenario(&cli)?;
    let config = scenario.simulation_config()?;
    print_parameters(&config);

    let inputs = load_inputs(&scenario, &config).context("loading inputs")?;
    let outcome = run_with_inputs(config, &inputs).context("replaying consumption")?;
    print_report(&outcome);

    if let Some(path) = &cli.ledger_out {
        export_csv(&outcome.output.ledger, path)
            .with_context(|| format!("writing ledger to {}", path.display()))?;
        tracing::info!(path = %path.display(), "ledger written");
    }

    if let Some(path) = &cli.points_out {
        let points = ledger_points(&cli.series, &outcome.output.ledger, &outcome.config);
        export_points(&points, path)
            .with_context(|| format!("writing points to {}", path.display()))?;
        tracing::info!(path = %path.display(), points = points.len(), "points written");
    }

    Ok(())
}
