//! Post-hoc cost report computed from a completed run.

use std::collections::BTreeMap;
use std::fmt;

use super::accumulator::{MonthlyAccumulator, YearMonth};
use super::engine::SimulationOutput;
use super::period::PeriodSummary;
use super::types::SimulationConfig;
use crate::tariff::RateBand;

/// Run-wide totals. Costs in minor currency units, energy in kWh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub agile_cost: f64,
    pub flux_cost: f64,
    pub previous_cost: f64,
    pub flux_total: f64,
    pub standing_charge: f64,
    pub grid_kwh: f64,
    pub export_kwh: f64,
    pub consumption_kwh: f64,
    pub solar_kwh: f64,
    pub days: u32,
    pub zero_grid_days: u32,
}

impl RunTotals {
    fn add(&mut self, month: &MonthlyAccumulator) {
        self.agile_cost += month.agile_cost;
        self.flux_cost += month.flux_cost;
        self.previous_cost += month.previous_cost;
        self.flux_total += month.flux_total;
        self.standing_charge += month.standing_charge;
        self.grid_kwh += month.grid_kwh;
        self.export_kwh += month.export_kwh;
        self.consumption_kwh += month.consumption_kwh;
        self.solar_kwh += month.solar_kwh;
        self.days += month.days;
        self.zero_grid_days += month.zero_grid_days;
    }

    /// Agile cost per metered kWh.
    pub fn total_effective_rate(&self) -> Option<f64> {
        ratio(self.agile_cost, self.consumption_kwh)
    }

    /// Agile cost per kWh drawn from the grid.
    pub fn grid_effective_rate(&self) -> Option<f64> {
        ratio(self.agile_cost, self.grid_kwh)
    }

    /// Share of solar generation used on site rather than exported.
    pub fn solar_self_use(&self) -> Option<f64> {
        ratio(self.solar_kwh - self.export_kwh, self.solar_kwh)
    }

    /// Savings from the battery and solar against plain agile billing.
    pub fn agile_savings(&self) -> f64 {
        self.previous_cost - self.agile_cost
    }

    /// Savings from the battery and solar against plain flux billing.
    pub fn flux_savings(&self) -> f64 {
        self.flux_total - self.flux_cost
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

/// Aggregate report of a complete replay.
///
/// Computed post-hoc from [`SimulationOutput`] so the report always agrees
/// with the ledger.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Monthly roll-up in calendar order.
    pub monthly: BTreeMap<YearMonth, MonthlyAccumulator>,
    pub totals: RunTotals,
    pub periods: PeriodSummary,
    /// Flux low, day and peak rates the averages are compared against.
    pub flux_rates: [f64; 3],
}

impl RunReport {
    /// Rolls the daily accumulators up into months and run totals.
    pub fn from_output(output: &SimulationOutput, config: &SimulationConfig) -> Self {
        let monthly = MonthlyAccumulator::rollup(&output.days);
        let mut totals = RunTotals::default();
        for month in monthly.values() {
            totals.add(month);
        }
        Self {
            monthly,
            totals,
            periods: output.periods,
            flux_rates: [
                config.flux_rate_low,
                config.flux_rate_day,
                config.flux_rate_peak,
            ],
        }
    }

    /// Configured flux rate of a band.
    pub fn flux_rate(&self, band: RateBand) -> f64 {
        match band {
            RateBand::Low => self.flux_rates[0],
            RateBand::Day => self.flux_rates[1],
            RateBand::Peak => self.flux_rates[2],
        }
    }

    /// Difference between the average agile peak and low rates.
    pub fn agile_low_peak_spread(&self) -> Option<f64> {
        let low = self.periods.average(RateBand::Low)?;
        let peak = self.periods.average(RateBand::Peak)?;
        Some(peak - low)
    }

    /// Difference between the flux peak and low rates.
    pub fn flux_low_peak_spread(&self) -> f64 {
        self.flux_rate(RateBand::Peak) - self.flux_rate(RateBand::Low)
    }
}

/// Formats minor currency units as pounds.
struct Pounds(f64);

impl fmt::Display for Pounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{:.2}", self.0 / 100.0)
    }
}

struct Maybe(Option<f64>);

impl fmt::Display for Maybe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.2}"),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Period Averages ---")?;
        for band in [RateBand::Low, RateBand::Day, RateBand::Peak] {
            writeln!(
                f,
                "{:<5} agile average = {}  flux = {:.2}",
                band.label(),
                Maybe(self.periods.average(band)),
                self.flux_rate(band)
            )?;
        }
        writeln!(
            f,
            "agile low/peak difference = {}",
            Maybe(self.agile_low_peak_spread())
        )?;
        writeln!(
            f,
            "flux low/peak difference  = {:.2}",
            self.flux_low_peak_spread()
        )?;

        writeln!(f)?;
        writeln!(f, "--- Monthly ---")?;
        for (month, data) in &self.monthly {
            writeln!(
                f,
                "{month} : agile = {} flux = {} actual = {} consumption = {:.2} kWh \
                 effective rate = {} solar = {:.2} kWh export = {:.2} kWh savings = {} \
                 zero grid days = {}/{}",
                Pounds(data.agile_cost),
                Pounds(data.flux_cost),
                Pounds(data.previous_cost),
                data.consumption_kwh,
                Maybe(data.effective_rate().map(|r| r / 100.0)),
                data.solar_kwh,
                data.export_kwh,
                Pounds(data.savings()),
                data.zero_grid_days,
                data.days,
            )?;
        }

        let t = &self.totals;
        writeln!(f)?;
        writeln!(f, "--- Totals ---")?;
        writeln!(f, "agile cost:            {}", Pounds(t.agile_cost))?;
        writeln!(f, "flux cost:             {}", Pounds(t.flux_cost))?;
        writeln!(f, "standing charge:       {}", Pounds(t.standing_charge))?;
        writeln!(f, "grid consumption:      {:.2} kWh", t.grid_kwh)?;
        writeln!(f, "grid export:           {:.2} kWh", t.export_kwh)?;
        writeln!(f, "actual consumption:    {:.2} kWh", t.consumption_kwh)?;
        writeln!(f, "actual cost:           {}", Pounds(t.previous_cost))?;
        writeln!(f, "total solar:           {:.2} kWh", t.solar_kwh)?;
        writeln!(
            f,
            "total effective rate:  {} per unit",
            Maybe(t.total_effective_rate().map(|r| r / 100.0))
        )?;
        writeln!(
            f,
            "grid effective rate:   {} per unit",
            Maybe(t.grid_effective_rate().map(|r| r / 100.0))
        )?;
        writeln!(f, "days with 0 grid use:  {} of {}", t.zero_grid_days, t.days)?;
        writeln!(
            f,
            "solar self-use:        {}%",
            Maybe(t.solar_self_use().map(|r| r * 100.0))
        )?;
        writeln!(f, "agile potential savings: {}", Pounds(t.agile_savings()))?;
        write!(f, "flux potential savings:  {}", Pounds(t.flux_savings()))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::sim::accumulator::DailyAccumulator;

    fn output(days: Vec<DailyAccumulator>) -> SimulationOutput {
        SimulationOutput {
            ledger: Vec::new(),
            days,
            periods: PeriodSummary::default(),
            final_battery_kwh: 0.0,
        }
    }

    fn day(month: u32, d: u32) -> DailyAccumulator {
        DailyAccumulator {
            consumption_kwh: 10.0,
            grid_kwh: 8.0,
            agile_cost: 200.0,
            flux_cost: 240.0,
            previous_cost: 260.0,
            flux_total: 280.0,
            export_kwh: 1.0,
            solar_kwh: 4.0,
            ..DailyAccumulator::new(NaiveDate::from_ymd_opt(2024, month, d).expect("valid date"))
        }
    }

    #[test]
    fn totals_sum_every_month() {
        let config = SimulationConfig::default();
        let report = RunReport::from_output(&output(vec![day(1, 1), day(1, 2), day(2, 1)]), &config);

        assert_eq!(report.monthly.len(), 2);
        assert_eq!(report.totals.days, 3);
        assert_abs_diff_eq!(report.totals.agile_cost, 600.0);
        assert_abs_diff_eq!(report.totals.agile_savings(), 180.0);
        assert_abs_diff_eq!(report.totals.flux_savings(), 120.0);
        assert_abs_diff_eq!(report.totals.solar_self_use().expect("solar"), 0.75);
        assert_abs_diff_eq!(report.totals.grid_effective_rate().expect("grid"), 25.0);
        assert_abs_diff_eq!(report.flux_low_peak_spread(), 39.34 - 16.86, epsilon = 1e-9);
    }

    #[test]
    fn monthly_line_counts_zero_grid_days() {
        let config = SimulationConfig::default();
        let off_grid = DailyAccumulator {
            grid_kwh: 0.0,
            ..day(4, 2)
        };
        let report = RunReport::from_output(&output(vec![day(4, 1), off_grid]), &config);
        assert_eq!(report.totals.zero_grid_days, 1);
        assert!(report.to_string().contains("2024-04 : "));
        assert!(report.to_string().contains("zero grid days = 1/2"));
    }

    #[test]
    fn empty_report_guards_divisions() {
        let config = SimulationConfig::default();
        let report = RunReport::from_output(&output(Vec::new()), &config);
        assert!(report.totals.total_effective_rate().is_none());
        assert!(report.totals.solar_self_use().is_none());
        assert!(report.agile_low_peak_spread().is_none());

        let text = report.to_string();
        assert!(text.contains("n/a"));
        assert!(text.contains("--- Totals ---"));
    }

    #[test]
    fn display_shows_pounds() {
        let config = SimulationConfig::default();
        let report = RunReport::from_output(&output(vec![day(3, 1)]), &config);
        let text = report.to_string();
        assert!(text.contains("2024-03 : agile = £2.00 flux = £2.40 actual = £2.60"));
        assert!(text.contains("zero grid days = 0/1"));
        assert!(text.contains("agile cost:            £2.00"));
    }
}
