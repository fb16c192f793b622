use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::NaiveDate;

use crate::devices::types::SolarSource;
use crate::sim::types::LocalSlot;

/// Share of annual output generated in each calendar month.
///
/// Taken from regional sunshine-hour averages; the entries sum to 1.
pub const MONTHLY_WEIGHTS: [f64; 12] = [
    0.034, 0.046, 0.075, 0.108, 0.128, 0.130, 0.134, 0.120, 0.091, 0.066, 0.038, 0.030,
];

/// Daylight hours per calendar month as `(first hour, end hour)`, end exclusive.
///
/// Mid-month local sunrise and sunset, rounded to whole hours.
pub const DAYLIGHT_HOURS: [(u32, u32); 12] = [
    (9, 15),
    (8, 16),
    (7, 17),
    (7, 19),
    (6, 20),
    (6, 20),
    (6, 20),
    (7, 19),
    (8, 18),
    (8, 17),
    (8, 15),
    (9, 15),
];

/// Distributes an annual output figure across the twelve months.
///
/// # Examples
///
/// ```
/// use agile_replay::devices::solar::monthly_split;
///
/// let months = monthly_split(1000.0);
/// assert!((months[6] - 134.0).abs() < 1e-9);
/// ```
pub fn monthly_split(annual_kwh: f64) -> [f64; 12] {
    MONTHLY_WEIGHTS.map(|weight| annual_kwh * weight)
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => u32::try_from((next - first).num_days()).unwrap_or(30),
        _ => 30,
    }
}

/// Fits a discretised bell curve over `slots` half hours summing to `total_kwh`.
///
/// The density is centred on the middle slot with the population standard
/// deviation of the slot indices, then normalised so the slots add up to
/// exactly `total_kwh`.
pub fn daily_curve(total_kwh: f64, slots: usize) -> Vec<f64> {
    if slots == 0 {
        return Vec::new();
    }
    let n = slots as f64;
    let mean = (n - 1.0) / 2.0;
    let variance = (0..slots).map(|i| (i as f64 - mean).powi(2)).sum::<f64>() / n;
    if variance <= 0.0 {
        return vec![total_kwh / n; slots];
    }
    let std_dev = variance.sqrt();

    let density: Vec<f64> = (0..slots)
        .map(|i| {
            let z = (i as f64 - mean) / std_dev;
            (-0.5 * z * z).exp() / (std_dev * (2.0 * PI).sqrt())
        })
        .collect();
    let norm: f64 = density.iter().sum();
    density.into_iter().map(|d| d / norm * total_kwh).collect()
}

/// Solar generation model driven by an annual output figure.
///
/// Each month's daily curve is fitted the first time that month is queried and
/// reused for the rest of the run, so every day of a month has the same shape
/// and total.
#[derive(Debug, Clone)]
pub struct SolarModel {
    /// Output per month (kWh), January first.
    pub monthly_kwh: [f64; 12],

    /// Fitted half-hour curves keyed by month.
    curves: BTreeMap<u32, Vec<f64>>,
}

impl SolarModel {
    /// Creates a model for the given annual output.
    pub fn new(annual_output_kwh: f64) -> Self {
        Self {
            monthly_kwh: monthly_split(annual_output_kwh.max(0.0)),
            curves: BTreeMap::new(),
        }
    }

    /// Generation in the half hour starting at `hour:minute` of the given month (kWh).
    ///
    /// Returns 0 outside the month's daylight window. The `year` only matters
    /// the first time a month is seen, when it fixes the number of days.
    pub fn generation_for(&mut self, month: u32, year: i32, hour: u32, minute: u32) -> f64 {
        let Some(&(first_hour, end_hour)) = month
            .checked_sub(1)
            .and_then(|i| DAYLIGHT_HOURS.get(i as usize))
        else {
            return 0.0;
        };
        if !(first_hour..end_hour).contains(&hour) {
            return 0.0;
        }

        let index = ((hour - first_hour) * 2 + u32::from(minute >= 30)) as usize;
        self.curve(month, year).get(index).copied().unwrap_or(0.0)
    }

    /// The cached daily curve for `month`, fitting it on first use.
    pub fn curve(&mut self, month: u32, year: i32) -> &[f64] {
        let monthly_kwh = &self.monthly_kwh;
        self.curves.entry(month).or_insert_with(|| {
            let index = month.saturating_sub(1) as usize;
            let (first_hour, end_hour) = DAYLIGHT_HOURS.get(index).copied().unwrap_or((0, 0));
            let daily_kwh = monthly_kwh.get(index).copied().unwrap_or(0.0)
                / f64::from(days_in_month(year, month));
            let slots = (end_hour.saturating_sub(first_hour) * 2) as usize;
            tracing::debug!(month, year, daily_kwh, slots, "fitted daily solar curve");
            daily_curve(daily_kwh, slots)
        })
    }

    /// Number of months with a fitted curve.
    pub fn cached_months(&self) -> usize {
        self.curves.len()
    }
}

impl SolarSource for SolarModel {
    fn generation_kwh(&mut self, slot: &LocalSlot) -> f64 {
        self.generation_for(slot.month, slot.year, slot.hour, slot.minute)
    }

    fn source_type(&self) -> &'static str {
        "SolarModel"
    }
}
