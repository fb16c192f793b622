//! Core simulation types: configuration, clock values, and per-interval records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

/// Length of one metering interval in minutes.
pub const INTERVAL_MINUTES: i64 = 30;

/// Number of metering intervals in an hour.
pub const INTERVALS_PER_HOUR: f64 = 2.0;

/// A wall-clock time expressed as minutes since local midnight.
///
/// Parsed from `"HH:MM"` strings in scenario files.
///
/// # Examples
///
/// ```
/// use agile_replay::sim::types::MinuteOfDay;
///
/// let t: MinuteOfDay = "05:30".parse().unwrap();
/// assert_eq!(t.minutes(), 330);
/// assert_eq!(t.hour(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    /// Midnight.
    pub const MIDNIGHT: Self = Self(0);

    /// Builds a time from hour and minute, or `None` when out of range.
    pub const fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    /// Builds a time from minutes since midnight, or `None` when `>= 1440`.
    pub const fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes < 24 * 60 {
            Some(Self(minutes as u16))
        } else {
            None
        }
    }

    /// Minutes since midnight, in `[0, 1440)`.
    pub const fn minutes(self) -> u32 {
        self.0 as u32
    }

    /// Hour component.
    pub const fn hour(self) -> u32 {
        self.0 as u32 / 60
    }

    /// Minute component.
    pub const fn minute(self) -> u32 {
        self.0 as u32 % 60
    }
}

impl FromStr for MinuteOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected \"HH:MM\", got \"{s}\""))?;
        let hour: u32 = h
            .parse()
            .map_err(|_| format!("invalid hour in \"{s}\""))?;
        let minute: u32 = m
            .parse()
            .map_err(|_| format!("invalid minute in \"{s}\""))?;
        Self::from_hm(hour, minute).ok_or_else(|| format!("\"{s}\" is not a time of day"))
    }
}

impl TryFrom<String> for MinuteOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// A set of calendar months (1 = January).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<u32>")]
pub struct MonthSet(u16);

impl MonthSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from month numbers, rejecting anything outside `1..=12`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid month.
    pub fn from_months(months: &[u32]) -> Result<Self, String> {
        let mut bits = 0_u16;
        for &month in months {
            if !(1..=12).contains(&month) {
                return Err(format!("month {month} is outside 1..=12"));
            }
            bits |= 1 << month;
        }
        Ok(Self(bits))
    }

    /// Whether `month` is in the set.
    pub fn contains(self, month: u32) -> bool {
        (1..=12).contains(&month) && self.0 & (1 << month) != 0
    }

    /// Whether no month is in the set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Months in ascending order.
    pub fn months(self) -> Vec<u32> {
        (1..=12).filter(|&m| self.contains(m)).collect()
    }
}

impl TryFrom<Vec<u32>> for MonthSet {
    type Error = String;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_months(&value)
    }
}

impl fmt::Display for MonthSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.months())
    }
}

/// Immutable parameters of one replay run.
///
/// Built from a validated [`crate::config::ScenarioConfig`] and passed by
/// reference to every component. Rates are in minor currency units per kWh.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Usable battery capacity (kWh).
    pub battery_capacity_kwh: f64,
    /// Charge floor the battery is never drained below (kWh).
    pub battery_min_kwh: f64,
    /// Inverter power limit (kW); half of it bounds energy per interval.
    pub inverter_limit_kw: f64,
    /// Start of the grid charging window (inclusive).
    pub charge_window_start: MinuteOfDay,
    /// End of the grid charging window (exclusive).
    pub charge_window_end: MinuteOfDay,
    /// Months with the winter discharge schedule.
    pub winter_months: MonthSet,
    /// Months with the summer charging rules.
    pub summer_months: MonthSet,
    /// Time after which the battery may discharge in winter.
    pub winter_battery_start: MinuteOfDay,
    /// Whether the battery is grid-charged in summer months.
    pub summer_charge_battery: bool,
    /// Whether to grid-charge in summer whenever the agile rate is negative.
    pub summer_charge_when_negative: bool,
    /// Flux low band rate.
    pub flux_rate_low: f64,
    /// Flux day band rate.
    pub flux_rate_day: f64,
    /// Flux peak band rate.
    pub flux_rate_peak: f64,
    /// Instant after which scheduled grid charging adds no energy.
    pub model_cutoff: DateTime<Utc>,
    /// Annual solar output used for the monthly split (kWh).
    pub annual_solar_output_kwh: f64,
    /// Agile standing charge per day, spread over the day's intervals.
    pub standing_charge_per_day: f64,
    /// Local time zone for clock and calendar decisions.
    pub timezone: Tz,
}

impl SimulationConfig {
    /// Maximum energy the inverter moves in or out of the battery per interval (kWh).
    pub fn max_interval_kwh(&self) -> f64 {
        self.inverter_limit_kw / INTERVALS_PER_HOUR
    }

    /// Standing charge attributed to a single interval.
    pub fn standing_charge_per_interval(&self) -> f64 {
        self.standing_charge_per_day / 48.0
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            battery_capacity_kwh: 9.5,
            battery_min_kwh: 0.0,
            inverter_limit_kw: 6.6,
            charge_window_start: MinuteOfDay(2 * 60),
            charge_window_end: MinuteOfDay(5 * 60),
            winter_months: MonthSet::from_months(&[1, 2, 11, 12]).unwrap_or_default(),
            summer_months: MonthSet::from_months(&[5, 6, 7, 8]).unwrap_or_default(),
            winter_battery_start: MinuteOfDay(15 * 60 + 30),
            summer_charge_battery: true,
            summer_charge_when_negative: false,
            flux_rate_low: 16.86,
            flux_rate_day: 28.10,
            flux_rate_peak: 39.34,
            model_cutoff: DateTime::<Utc>::MAX_UTC,
            annual_solar_output_kwh: 0.0,
            standing_charge_per_day: 41.03,
            timezone: chrono_tz::Europe::London,
        }
    }
}

/// One metered half hour of household consumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionInterval {
    /// Interval start (UTC, half-hour aligned).
    pub timestamp: DateTime<Utc>,
    /// Energy consumed during the interval (kWh, non-negative).
    pub consumption_kwh: f64,
}

/// An interval start decomposed into local calendar and clock fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSlot {
    /// Local calendar date.
    pub date: NaiveDate,
    /// Local year.
    pub year: i32,
    /// Local month (1 = January).
    pub month: u32,
    /// Local hour.
    pub hour: u32,
    /// Local minute.
    pub minute: u32,
    /// Local wall-clock time.
    pub time_of_day: MinuteOfDay,
}

/// Immutable record of one replayed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalLedgerEntry {
    /// Interval start (UTC).
    pub timestamp: DateTime<Utc>,
    /// Local wall-clock time of the interval start.
    pub time_of_day: MinuteOfDay,
    /// Energy drawn from the grid, including any battery charging (kWh).
    pub grid_consumption_kwh: f64,
    /// Energy drawn from the grid to charge the battery (kWh).
    pub grid_charge_kwh: f64,
    /// Energy drawn from the battery to meet load (kWh).
    pub battery_discharged_kwh: f64,
    /// Agile import rate for the interval.
    pub import_rate: f64,
    /// Agile export rate for the interval.
    pub export_rate: f64,
    /// Net agile cost of the interval; export credit makes it negative.
    pub agile_cost: f64,
    /// Flux rate used to cost the grid draw.
    pub flux_rate_applied: f64,
    /// Flux cost of the grid draw.
    pub flux_cost: f64,
    /// Battery charge at the end of the interval (kWh).
    pub battery_charge_after: f64,
    /// Modelled solar generation (kWh).
    pub solar_generated_kwh: f64,
    /// Solar surplus exported to the grid (kWh).
    pub solar_exported_kwh: f64,
    /// Metered household consumption (kWh).
    pub raw_usage_kwh: f64,
    /// Whether the interval was spent charging from the grid.
    pub charging_from_grid: bool,
}

impl fmt::Display for IntervalLedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) | usage={:.3} grid={:.3} kWh | agile={:.2} export={:.2} cost={:.3} | \
             flux={:.2} | battery={:.3} kWh | solar={:.3} exported={:.3}{}",
            self.timestamp.format("%Y-%m-%dT%H:%MZ"),
            self.time_of_day,
            self.raw_usage_kwh,
            self.grid_consumption_kwh,
            self.import_rate,
            self.export_rate,
            self.agile_cost,
            self.flux_rate_applied,
            self.battery_charge_after,
            self.solar_generated_kwh,
            self.solar_exported_kwh,
            if self.charging_from_grid { " [charging]" } else { "" },
        )
    }
}
