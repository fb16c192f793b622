//! Daily low/day/peak agile rate averages.
//!
//! Each band sums the agile import rates of its half hours and is finalized at
//! a fixed local time by dividing by the band's slot count. Finalized band sums
//! also feed a run-wide [`PeriodSummary`].

use crate::sim::types::MinuteOfDay;
use crate::tariff::RateBand;

/// Progress of one band's average within a day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodState {
    /// Collecting rates for the band.
    Accumulating { sum: f64, count: u32 },
    /// The boundary minute has passed; the day's average is fixed.
    Finalized { average: f64 },
}

/// Averages one band's agile rates over a day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodAccumulator {
    band: RateBand,
    state: PeriodState,
}

impl PeriodAccumulator {
    pub fn new(band: RateBand) -> Self {
        Self {
            band,
            state: PeriodState::Accumulating { sum: 0.0, count: 0 },
        }
    }

    pub fn band(&self) -> RateBand {
        self.band
    }

    pub fn state(&self) -> PeriodState {
        self.state
    }

    /// Half hours the band covers in a full day.
    pub fn slots(band: RateBand) -> u32 {
        match band {
            RateBand::Low => 6,
            RateBand::Day => 34,
            RateBand::Peak => 6,
        }
    }

    /// Local time at which the band's average is finalized.
    ///
    /// The interval starting at this minute is still added before the check.
    pub fn finalize_at(band: RateBand) -> MinuteOfDay {
        let (hour, minute) = match band {
            RateBand::Low => (5, 30),
            RateBand::Day => (23, 30),
            RateBand::Peak => (18, 30),
        };
        MinuteOfDay::from_hm(hour, minute).unwrap_or(MinuteOfDay::MIDNIGHT)
    }

    /// Band whose average includes the interval starting at `time`.
    ///
    /// Differs from the flux classification only for 23:00 to 24:00, which
    /// belongs to no average.
    pub fn band_for(time: MinuteOfDay) -> Option<RateBand> {
        match time.hour() {
            23 => None,
            hour => Some(RateBand::for_hour(hour)),
        }
    }

    /// Adds a rate. Ignored once the band is finalized.
    pub fn add(&mut self, rate: f64) {
        if let PeriodState::Accumulating { sum, count } = &mut self.state {
            *sum += rate;
            *count += 1;
        }
    }

    /// Fixes the average and returns the band sum.
    ///
    /// Returns `None` if already finalized or if the band saw no rate at all,
    /// in which case the day has no average for it.
    pub fn finalize(&mut self) -> Option<f64> {
        let PeriodState::Accumulating { sum, count } = self.state else {
            return None;
        };
        if count == 0 {
            tracing::debug!(band = %self.band, "no rates for band");
            return None;
        }
        let slots = Self::slots(self.band);
        if count != slots {
            tracing::debug!(
                band = %self.band,
                count,
                slots,
                "finalizing a band with incomplete coverage"
            );
        }
        self.state = PeriodState::Finalized {
            average: sum / f64::from(slots),
        };
        Some(sum)
    }

    /// The day's average once finalized.
    pub fn average(&self) -> Option<f64> {
        match self.state {
            PeriodState::Finalized { average } => Some(average),
            PeriodState::Accumulating { .. } => None,
        }
    }
}

/// The three band accumulators of the current day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodAccumulators {
    pub low: PeriodAccumulator,
    pub day: PeriodAccumulator,
    pub peak: PeriodAccumulator,
}

impl Default for PeriodAccumulators {
    fn default() -> Self {
        Self {
            low: PeriodAccumulator::new(RateBand::Low),
            day: PeriodAccumulator::new(RateBand::Day),
            peak: PeriodAccumulator::new(RateBand::Peak),
        }
    }
}

impl PeriodAccumulators {
    /// Records the agile rate of the half hour starting at `time`.
    ///
    /// A missing rate still advances the clock, so boundaries are crossed
    /// whether or not their own slot is priced. Returns every band finalized
    /// by this half hour together with its sum.
    pub fn record(&mut self, time: MinuteOfDay, rate: Option<f64>) -> Vec<(RateBand, f64)> {
        if let (Some(band), Some(rate)) = (PeriodAccumulator::band_for(time), rate) {
            self.get_mut(band).add(rate);
        }

        [RateBand::Low, RateBand::Day, RateBand::Peak]
            .into_iter()
            .filter(|&band| PeriodAccumulator::finalize_at(band) == time)
            .filter_map(|band| self.get_mut(band).finalize().map(|sum| (band, sum)))
            .collect()
    }

    pub fn get(&self, band: RateBand) -> &PeriodAccumulator {
        match band {
            RateBand::Low => &self.low,
            RateBand::Day => &self.day,
            RateBand::Peak => &self.peak,
        }
    }

    fn get_mut(&mut self, band: RateBand) -> &mut PeriodAccumulator {
        match band {
            RateBand::Low => &mut self.low,
            RateBand::Day => &mut self.day,
            RateBand::Peak => &mut self.peak,
        }
    }
}

/// Running total of one band across all finalized days.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandTotal {
    pub sum: f64,
    pub finalized_days: u32,
}

/// Grand totals behind the low/day/peak average-rate summary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodSummary {
    pub low: BandTotal,
    pub day: BandTotal,
    pub peak: BandTotal,
}

impl PeriodSummary {
    /// Adds a finalized day's band sum.
    pub fn add(&mut self, band: RateBand, sum: f64) {
        let total = self.get_mut(band);
        total.sum += sum;
        total.finalized_days += 1;
    }

    pub fn total(&self, band: RateBand) -> BandTotal {
        match band {
            RateBand::Low => self.low,
            RateBand::Day => self.day,
            RateBand::Peak => self.peak,
        }
    }

    fn get_mut(&mut self, band: RateBand) -> &mut BandTotal {
        match band {
            RateBand::Low => &mut self.low,
            RateBand::Day => &mut self.day,
            RateBand::Peak => &mut self.peak,
        }
    }

    /// Mean agile rate of the band over every finalized day.
    pub fn average(&self, band: RateBand) -> Option<f64> {
        let total = self.total(band);
        (total.finalized_days > 0).then(|| {
            total.sum / (f64::from(total.finalized_days) * f64::from(PeriodAccumulator::slots(band)))
        })
    }
}
