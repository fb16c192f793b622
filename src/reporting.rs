//! Console output for a replay run.

use std::fmt;

use crate::runner::RunOutcome;
use crate::sim::types::SimulationConfig;

/// Run parameters, printed before the replay starts.
pub struct ParameterBanner<'a>(pub &'a SimulationConfig);

impl fmt::Display for ParameterBanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0;
        writeln!(f, "--- Parameters ---")?;
        writeln!(
            f,
            "battery: {:.2} kWh (floor {:.2} kWh), inverter {:.2} kW",
            c.battery_capacity_kwh, c.battery_min_kwh, c.inverter_limit_kw
        )?;
        writeln!(
            f,
            "charge window: {} - {} ({})",
            c.charge_window_start, c.charge_window_end, c.timezone
        )?;
        writeln!(
            f,
            "winter months: {} (battery from {})",
            c.winter_months, c.winter_battery_start
        )?;
        writeln!(
            f,
            "summer months: {} (grid charging {}, charge on negative rates {})",
            c.summer_months, c.summer_charge_battery, c.summer_charge_when_negative
        )?;
        writeln!(
            f,
            "flux rates: low {:.2} / day {:.2} / peak {:.2}, standing charge {:.2}",
            c.flux_rate_low, c.flux_rate_day, c.flux_rate_peak, c.standing_charge_per_day
        )?;
        write!(f, "annual solar output: {:.0} kWh", c.annual_solar_output_kwh)?;
        if c.model_cutoff < chrono::DateTime::<chrono::Utc>::MAX_UTC {
            write!(f, "\nmodel cutoff: {}", c.model_cutoff.to_rfc3339())?;
        }
        Ok(())
    }
}

pub fn print_parameters(config: &SimulationConfig) {
    println!("{}", ParameterBanner(config));
}

pub fn print_report(outcome: &RunOutcome) {
    if outcome.missing_intervals > 0 {
        println!(
            "note: {} half hours of consumption were missing",
            outcome.missing_intervals
        );
    }
    println!("\n{}", outcome.report);
    println!(
        "final battery charge: {:.2} kWh",
        outcome.output.final_battery_kwh
    );
}
