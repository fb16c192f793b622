//! Replay engine that walks consumption intervals through the battery and tariffs.

use chrono::{DateTime, NaiveDate, Utc};

use crate::devices::{BatteryPolicy, BatteryState, SolarModel, SolarSource};
use crate::error::{RateKind, Result, SimError};
use crate::tariff::{RateBand, RateTable, TariffClassifier};

use super::accumulator::DailyAccumulator;
use super::period::PeriodSummary;
use super::types::{ConsumptionInterval, IntervalLedgerEntry, SimulationConfig};

/// Everything a completed run produces.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// One entry per replayed interval, in timestamp order.
    pub ledger: Vec<IntervalLedgerEntry>,
    /// One accumulator per local date, in date order.
    pub days: Vec<DailyAccumulator>,
    /// Grand totals of the finalized low/day/peak averages.
    pub periods: PeriodSummary,
    /// Battery charge after the last interval (kWh).
    pub final_battery_kwh: f64,
}

/// Sequential replay engine.
///
/// Owns the battery state and the daily accumulators exclusively. Generic over
/// the solar source for static dispatch; the fitted [`SolarModel`] is the
/// default.
pub struct SimulationEngine<'a, S: SolarSource = SolarModel> {
    config: &'a SimulationConfig,
    tariff: TariffClassifier<'a>,
    policy: BatteryPolicy<'a>,
    solar: S,
    battery: BatteryState,
    today: Option<DailyAccumulator>,
    days: Vec<DailyAccumulator>,
    periods: PeriodSummary,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<'a> SimulationEngine<'a, SolarModel> {
    /// Creates an engine with a solar model sized from the configured annual output.
    pub fn new(config: &'a SimulationConfig, import: &'a RateTable, export: &'a RateTable) -> Self {
        let solar = SolarModel::new(config.annual_solar_output_kwh);
        Self::with_solar(config, import, export, solar)
    }
}

impl<'a, S: SolarSource> SimulationEngine<'a, S> {
    /// Creates an engine with an explicit solar source.
    pub fn with_solar(
        config: &'a SimulationConfig,
        import: &'a RateTable,
        export: &'a RateTable,
        solar: S,
    ) -> Self {
        Self {
            config,
            tariff: TariffClassifier::new(config, import, export),
            policy: BatteryPolicy::new(config),
            solar,
            battery: BatteryState::new(config),
            today: None,
            days: Vec::new(),
            periods: PeriodSummary::default(),
            last_timestamp: None,
        }
    }

    /// Replays one interval and returns its ledger entry.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfOrder`] when the interval does not follow the
    /// previous one and [`SimError::DataGap`] when either agile rate is
    /// missing. Engine state is unchanged on error.
    pub fn step(&mut self, interval: &ConsumptionInterval) -> Result<IntervalLedgerEntry> {
        let timestamp = interval.timestamp;
        if let Some(previous) = self.last_timestamp {
            if timestamp <= previous {
                return Err(SimError::OutOfOrder {
                    previous,
                    timestamp,
                });
            }
        }

        let import_rate = self.tariff.agile_import_rate(timestamp)?;
        let export_rate = self.tariff.agile_export_rate(timestamp)?;
        self.last_timestamp = Some(timestamp);

        // 1. Day rollover
        let slot = self.tariff.local_slot(timestamp);
        let mut day = match self.today.take() {
            Some(day) if day.date == slot.date => day,
            Some(finished) => {
                tracing::debug!(
                    date = %finished.date,
                    grid_kwh = finished.grid_kwh,
                    agile_cost = finished.agile_cost,
                    low = ?finished.period_average(RateBand::Low),
                    day = ?finished.period_average(RateBand::Day),
                    peak = ?finished.period_average(RateBand::Peak),
                    "day complete"
                );
                self.days.push(finished);
                self.open_day(slot.date)
            }
            None => self.open_day(slot.date),
        };

        // 2. Solar and flux band
        let usage = interval.consumption_kwh;
        let solar = self.solar.generation_kwh(&slot);
        let flux_rate = self.tariff.flux_rate(slot.hour);

        // 3. Battery and grid
        let charging_from_grid = self.policy.may_charge_from_grid(
            slot.month,
            slot.time_of_day,
            self.battery.charge_kwh,
            import_rate,
        );

        let mut grid_charge_kwh = 0.0;
        let mut battery_discharged_kwh = 0.0;
        let mut solar_exported_kwh = 0.0;
        let mut agile_cost = 0.0;
        let grid_consumption_kwh;
        let flux_rate_applied;

        if charging_from_grid {
            // Scheduled charging stops adding energy after the cutoff.
            grid_charge_kwh = if timestamp < self.config.model_cutoff {
                self.battery.headroom_kwh().min(self.policy.max_drain_kwh())
            } else {
                0.0
            };
            self.battery.charge(grid_charge_kwh);

            grid_consumption_kwh = grid_charge_kwh + usage;
            flux_rate_applied = self.config.flux_rate_low;
            agile_cost += grid_consumption_kwh * import_rate;
        } else {
            let mut demand = usage;
            if solar >= demand {
                let overflow = self.battery.charge(solar - demand);
                solar_exported_kwh = overflow;
                agile_cost -= overflow * export_rate;
                demand = 0.0;
            } else {
                demand -= solar;
            }

            if demand > 0.0 && self.policy.may_discharge(slot.month, slot.hour, slot.minute) {
                battery_discharged_kwh =
                    self.battery.discharge(demand, self.policy.max_drain_kwh());
                demand -= battery_discharged_kwh;
            }

            grid_consumption_kwh = demand.max(0.0);
            flux_rate_applied = flux_rate;
            agile_cost += grid_consumption_kwh * import_rate;
        }

        let entry = IntervalLedgerEntry {
            timestamp,
            time_of_day: slot.time_of_day,
            grid_consumption_kwh,
            grid_charge_kwh,
            battery_discharged_kwh,
            import_rate,
            export_rate,
            agile_cost,
            flux_rate_applied,
            flux_cost: grid_consumption_kwh * flux_rate_applied,
            battery_charge_after: self.battery.charge_kwh,
            solar_generated_kwh: solar,
            solar_exported_kwh,
            raw_usage_kwh: usage,
            charging_from_grid,
        };

        // 4. Daily totals
        day.record(&entry, flux_rate, self.config.standing_charge_per_interval());
        self.today = Some(day);

        tracing::trace!("{entry}");
        Ok(entry)
    }

    /// Starts a local date, taking its low/day/peak averages from the import
    /// table so that missing meter readings leave them untouched.
    fn open_day(&mut self, date: NaiveDate) -> DailyAccumulator {
        let mut day = DailyAccumulator::new(date);
        for (time, rate) in self.tariff.import_day(date) {
            for (band, sum) in day.periods.record(time, rate) {
                self.periods.add(band, sum);
            }
        }
        day
    }

    /// Replays every interval and returns the ledger and aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyInput`] when there is no consumption or rate
    /// data, and stops at the first error from [`Self::step`] without
    /// returning partial output.
    pub fn run(mut self, intervals: &[ConsumptionInterval]) -> Result<SimulationOutput> {
        if intervals.is_empty() {
            return Err(SimError::EmptyInput("consumption"));
        }
        for table in [RateKind::Import, RateKind::Export] {
            if self.tariff.table(table).is_empty() {
                return Err(SimError::EmptyInput(match table {
                    RateKind::Import => "agile import rate",
                    RateKind::Export => "agile export rate",
                }));
            }
        }

        tracing::info!(
            intervals = intervals.len(),
            solar = self.solar.source_type(),
            "replaying consumption"
        );

        let mut ledger = Vec::with_capacity(intervals.len());
        for interval in intervals {
            ledger.push(self.step(interval)?);
        }
        Ok(self.finish(ledger))
    }

    /// Closes the current day and hands back the aggregates.
    pub fn finish(mut self, ledger: Vec<IntervalLedgerEntry>) -> SimulationOutput {
        if let Some(day) = self.today.take() {
            self.days.push(day);
        }
        SimulationOutput {
            ledger,
            days: self.days,
            periods: self.periods,
            final_battery_kwh: self.battery.charge_kwh,
        }
    }

    /// Returns the battery state.
    pub fn battery(&self) -> &BatteryState {
        &self.battery
    }
}
