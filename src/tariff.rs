//! Flux band classification and agile rate lookups.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use crate::config::local_midnight;
use crate::error::{RateKind, Result, SimError};
use crate::sim::clock::Clock;
use crate::sim::types::{LocalSlot, MinuteOfDay, SimulationConfig};

/// Time-of-day band of the flux tariff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateBand {
    /// 02:00 to 05:00.
    Low,
    /// Everything outside the low and peak bands.
    Day,
    /// 16:00 to 19:00.
    Peak,
}

impl RateBand {
    /// Classifies a local hour.
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            2..5 => Self::Low,
            16..19 => Self::Peak,
            _ => Self::Day,
        }
    }

    /// Short label used in reports and sink tags.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Day => "day",
            Self::Peak => "peak",
        }
    }
}

impl fmt::Display for RateBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Agile rates keyed by interval start.
#[derive(Debug, Clone)]
pub struct RateTable {
    kind: RateKind,
    rates: BTreeMap<DateTime<Utc>, f64>,
}

impl RateTable {
    /// Builds a table from `(interval start, rate)` pairs. Later duplicates win.
    pub fn new(kind: RateKind, rates: impl IntoIterator<Item = (DateTime<Utc>, f64)>) -> Self {
        Self {
            kind,
            rates: rates.into_iter().collect(),
        }
    }

    /// Combines two products of the same tariff around a switchover instant.
    ///
    /// Rates from `earlier` apply strictly before `switch_at`, rates from
    /// `later` at or after it.
    pub fn with_switchover(earlier: &Self, later: &Self, switch_at: DateTime<Utc>) -> Self {
        let rates = earlier
            .rates
            .range(..switch_at)
            .chain(later.rates.range(switch_at..))
            .map(|(&ts, &rate)| (ts, rate))
            .collect();
        Self {
            kind: later.kind,
            rates,
        }
    }

    /// Exact-match lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataGap`] when no rate starts at `timestamp`.
    pub fn rate_at(&self, timestamp: DateTime<Utc>) -> Result<f64> {
        self.rates
            .get(&timestamp)
            .copied()
            .ok_or(SimError::DataGap {
                table: self.kind,
                timestamp,
            })
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Stateless tariff lookups for one run.
///
/// Borrows the configuration for flux rates and the local time zone, and the
/// two agile tables for per-interval prices.
#[derive(Debug, Clone, Copy)]
pub struct TariffClassifier<'a> {
    config: &'a SimulationConfig,
    import: &'a RateTable,
    export: &'a RateTable,
}

impl<'a> TariffClassifier<'a> {
    pub fn new(config: &'a SimulationConfig, import: &'a RateTable, export: &'a RateTable) -> Self {
        Self {
            config,
            import,
            export,
        }
    }

    /// Decomposes an instant into local calendar and clock fields.
    pub fn local_slot(&self, timestamp: DateTime<Utc>) -> LocalSlot {
        let local = timestamp.with_timezone(&self.config.timezone);
        let (hour, minute) = (local.hour(), local.minute());
        LocalSlot {
            date: local.date_naive(),
            year: local.year(),
            month: local.month(),
            hour,
            minute,
            time_of_day: MinuteOfDay::from_hm(hour, minute).unwrap_or(MinuteOfDay::MIDNIGHT),
        }
    }

    /// Flux band of a local hour.
    pub fn flux_band(&self, hour: u32) -> RateBand {
        RateBand::for_hour(hour)
    }

    /// Flux rate that applies at a local hour.
    pub fn flux_rate(&self, hour: u32) -> f64 {
        self.band_rate(self.flux_band(hour))
    }

    /// Configured flux rate of a band.
    pub fn band_rate(&self, band: RateBand) -> f64 {
        match band {
            RateBand::Low => self.config.flux_rate_low,
            RateBand::Day => self.config.flux_rate_day,
            RateBand::Peak => self.config.flux_rate_peak,
        }
    }

    /// Agile import rate of the interval starting at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataGap`] when the import table has no entry.
    pub fn agile_import_rate(&self, timestamp: DateTime<Utc>) -> Result<f64> {
        self.import.rate_at(timestamp)
    }

    /// Agile export rate of the interval starting at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataGap`] when the export table has no entry.
    pub fn agile_export_rate(&self, timestamp: DateTime<Utc>) -> Result<f64> {
        self.export.rate_at(timestamp)
    }

    /// Agile import rates of every half hour of a local date, in clock order.
    ///
    /// Half hours without a rate carry `None`. Daylight-saving days yield 46
    /// or 50 slots.
    pub fn import_day(&self, date: NaiveDate) -> Vec<(MinuteOfDay, Option<f64>)> {
        let timezone = self.config.timezone;
        let bounds = local_midnight(timezone, date)
            .zip(date.succ_opt().and_then(|next| local_midnight(timezone, next)));
        let Some((start, end)) = bounds else {
            return Vec::new();
        };
        Clock::new(start, end)
            .map(|ts| (self.local_slot(ts).time_of_day, self.import.rate_at(ts).ok()))
            .collect()
    }

    /// The agile table for one direction.
    pub fn table(&self, kind: RateKind) -> &'a RateTable {
        match kind {
            RateKind::Import => self.import,
            RateKind::Export => self.export,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().expect("valid instant")
    }

    #[test]
    fn bands_follow_the_flux_clock() {
        assert_eq!(RateBand::for_hour(0), RateBand::Day);
        assert_eq!(RateBand::for_hour(1), RateBand::Day);
        assert_eq!(RateBand::for_hour(2), RateBand::Low);
        assert_eq!(RateBand::for_hour(4), RateBand::Low);
        assert_eq!(RateBand::for_hour(5), RateBand::Day);
        assert_eq!(RateBand::for_hour(15), RateBand::Day);
        assert_eq!(RateBand::for_hour(16), RateBand::Peak);
        assert_eq!(RateBand::for_hour(18), RateBand::Peak);
        assert_eq!(RateBand::for_hour(19), RateBand::Day);
        assert_eq!(RateBand::for_hour(23), RateBand::Day);
    }

    #[test]
    fn flux_rate_uses_configured_band_rates() {
        let config = SimulationConfig::default();
        let table = RateTable::new(RateKind::Import, []);
        let export = RateTable::new(RateKind::Export, []);
        let tariff = TariffClassifier::new(&config, &table, &export);
        assert_eq!(tariff.flux_rate(3), config.flux_rate_low);
        assert_eq!(tariff.flux_rate(12), config.flux_rate_day);
        assert_eq!(tariff.flux_rate(17), config.flux_rate_peak);
    }

    #[test]
    fn missing_rate_is_a_data_gap() {
        let table = RateTable::new(RateKind::Import, [(ts(2024, 1, 1, 0, 0), 15.0)]);
        assert_eq!(table.rate_at(ts(2024, 1, 1, 0, 0)).ok(), Some(15.0));
        let err = table.rate_at(ts(2024, 1, 1, 0, 30));
        assert!(matches!(
            err,
            Err(SimError::DataGap {
                table: RateKind::Import,
                ..
            })
        ));
    }

    #[test]
    fn switchover_takes_earlier_rates_before_and_later_rates_after() {
        let switch_at = ts(2024, 3, 1, 0, 0);
        let earlier = RateTable::new(
            RateKind::Import,
            [
                (ts(2024, 2, 29, 23, 30), 10.0),
                (ts(2024, 3, 1, 0, 0), 11.0),
            ],
        );
        let later = RateTable::new(
            RateKind::Import,
            [
                (ts(2024, 2, 29, 23, 30), 20.0),
                (ts(2024, 3, 1, 0, 0), 21.0),
            ],
        );
        let merged = RateTable::with_switchover(&earlier, &later, switch_at);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rate_at(ts(2024, 2, 29, 23, 30)).ok(), Some(10.0));
        assert_eq!(merged.rate_at(switch_at).ok(), Some(21.0));
    }

    #[test]
    fn import_day_walks_the_local_clock() {
        let config = SimulationConfig::default();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date");
        let table = RateTable::new(
            RateKind::Import,
            (0..47).map(|i| (ts(2024, 3, 4, 0, 0) + chrono::TimeDelta::minutes(30 * i), 9.0)),
        );
        let export = RateTable::new(RateKind::Export, []);
        let tariff = TariffClassifier::new(&config, &table, &export);

        let slots = tariff.import_day(day);
        assert_eq!(slots.len(), 48);
        assert_eq!(slots[0], (MinuteOfDay::MIDNIGHT, Some(9.0)));
        assert_eq!(slots[47].0.to_string(), "23:30");
        assert_eq!(slots[47].1, None);

        // Clocks go forward on the last Sunday of March.
        let short = NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date");
        assert_eq!(tariff.import_day(short).len(), 46);
    }

    #[test]
    fn local_slot_follows_british_summer_time() {
        let config = SimulationConfig::default();
        let table = RateTable::new(RateKind::Import, []);
        let export = RateTable::new(RateKind::Export, []);
        let tariff = TariffClassifier::new(&config, &table, &export);

        let winter = tariff.local_slot(ts(2024, 1, 15, 16, 30));
        assert_eq!((winter.hour, winter.minute), (16, 30));

        let summer = tariff.local_slot(ts(2024, 7, 15, 23, 30));
        assert_eq!((summer.hour, summer.minute), (0, 30));
        assert_eq!(summer.date.day(), 16);
        assert_eq!(summer.time_of_day.minutes(), 30);
    }
}
