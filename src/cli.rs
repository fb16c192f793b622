//! Command-line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::io::points::DEFAULT_SERIES;

/// Replays half-hourly smart-meter data through a home battery and solar
/// model and compares agile and flux tariff costs.
#[derive(Debug, Parser)]
#[command(name = "agile-replay", version)]
pub struct Cli {
    /// Load the scenario from a TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, no_battery, summer_solar)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// First local date to replay (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Local date to stop before (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Override the synthetic input seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Export the interval ledger to CSV
    #[arg(long, value_name = "PATH")]
    pub ledger_out: Option<PathBuf>,

    /// Export sink points to JSON
    #[arg(long, value_name = "PATH")]
    pub points_out: Option<PathBuf>,

    /// Series name for exported points
    #[arg(long, default_value = DEFAULT_SERIES)]
    pub series: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_dates_and_outputs() {
        let cli = Cli::try_parse_from([
            "agile-replay",
            "--preset",
            "no_battery",
            "--from",
            "2024-01-02",
            "--to",
            "2024-01-05",
            "--ledger-out",
            "ledger.csv",
        ])
        .expect("valid arguments");
        assert_eq!(cli.preset.as_deref(), Some("no_battery"));
        assert_eq!(cli.from, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(cli.series, "solar_electricity");
        assert!(cli.points_out.is_none());
    }

    #[test]
    fn scenario_and_preset_conflict() {
        let result = Cli::try_parse_from([
            "agile-replay",
            "--scenario",
            "a.toml",
            "--preset",
            "baseline",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["agile-replay", "--from", "yesterday"]).is_err());
    }
}
