//! Per-day running totals and their monthly roll-up.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::sim::period::PeriodAccumulators;
use crate::sim::types::IntervalLedgerEntry;
use crate::tariff::RateBand;

/// Totals of one local calendar day.
///
/// Costs are in minor currency units and kept unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAccumulator {
    pub date: NaiveDate,
    /// Metered household consumption (kWh).
    pub consumption_kwh: f64,
    /// Energy drawn from the grid, including battery charging (kWh).
    pub grid_kwh: f64,
    /// Net agile cost with the battery and solar in place.
    pub agile_cost: f64,
    /// Flux cost with the battery and solar in place.
    pub flux_cost: f64,
    /// Consumption priced at the agile import rate, without battery or solar.
    pub previous_cost: f64,
    /// Consumption priced at the flux band rate, without battery or solar.
    pub flux_total: f64,
    /// Solar surplus exported (kWh).
    pub export_kwh: f64,
    /// Modelled solar generation (kWh).
    pub solar_kwh: f64,
    /// Standing charge attributed to the day's intervals.
    pub standing_charge: f64,
    pub intervals: u32,
    /// Low/day/peak agile averages of the day.
    pub periods: PeriodAccumulators,
}

impl DailyAccumulator {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            consumption_kwh: 0.0,
            grid_kwh: 0.0,
            agile_cost: 0.0,
            flux_cost: 0.0,
            previous_cost: 0.0,
            flux_total: 0.0,
            export_kwh: 0.0,
            solar_kwh: 0.0,
            standing_charge: 0.0,
            intervals: 0,
            periods: PeriodAccumulators::default(),
        }
    }

    /// Adds one replayed interval.
    pub fn record(&mut self, entry: &IntervalLedgerEntry, flux_band_rate: f64, standing: f64) {
        self.consumption_kwh += entry.raw_usage_kwh;
        self.grid_kwh += entry.grid_consumption_kwh;
        self.agile_cost += entry.agile_cost;
        self.flux_cost += entry.flux_cost;
        self.previous_cost += entry.raw_usage_kwh * entry.import_rate;
        self.flux_total += entry.raw_usage_kwh * flux_band_rate;
        self.export_kwh += entry.solar_exported_kwh;
        self.solar_kwh += entry.solar_generated_kwh;
        self.standing_charge += standing;
        self.intervals += 1;
    }

    /// Whether nothing was drawn from the grid all day.
    pub fn is_zero_grid(&self) -> bool {
        self.grid_kwh == 0.0
    }

    /// Finalized agile average of a band, if the day reached its boundary.
    pub fn period_average(&self, band: RateBand) -> Option<f64> {
        self.periods.get(band).average()
    }
}

/// Calendar month key (`year`, `month`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Sum of the daily totals that share a calendar month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyAccumulator {
    pub consumption_kwh: f64,
    pub grid_kwh: f64,
    pub agile_cost: f64,
    pub flux_cost: f64,
    pub previous_cost: f64,
    pub flux_total: f64,
    pub export_kwh: f64,
    pub solar_kwh: f64,
    pub standing_charge: f64,
    pub days: u32,
    pub zero_grid_days: u32,
}

impl MonthlyAccumulator {
    /// Groups days by local year-month and sums them, in calendar order.
    pub fn rollup(days: &[DailyAccumulator]) -> BTreeMap<YearMonth, Self> {
        let mut months: BTreeMap<YearMonth, Self> = BTreeMap::new();
        for day in days {
            months.entry(YearMonth::of(day.date)).or_default().add(day);
        }
        months
    }

    fn add(&mut self, day: &DailyAccumulator) {
        self.consumption_kwh += day.consumption_kwh;
        self.grid_kwh += day.grid_kwh;
        self.agile_cost += day.agile_cost;
        self.flux_cost += day.flux_cost;
        self.previous_cost += day.previous_cost;
        self.flux_total += day.flux_total;
        self.export_kwh += day.export_kwh;
        self.solar_kwh += day.solar_kwh;
        self.standing_charge += day.standing_charge;
        self.days += 1;
        if day.is_zero_grid() {
            self.zero_grid_days += 1;
        }
    }

    /// Agile savings against paying the agile rate for all consumption.
    pub fn savings(&self) -> f64 {
        self.previous_cost - self.agile_cost
    }

    /// Agile cost per metered kWh, if anything was consumed.
    pub fn effective_rate(&self) -> Option<f64> {
        (self.consumption_kwh > 0.0).then(|| self.agile_cost / self.consumption_kwh)
    }
}
