use chrono::{DateTime, TimeDelta, Utc};

use super::types::INTERVAL_MINUTES;

/// A half-hour clock that ticks over a fixed `[start, end)` range.
///
/// Used to lay out the intervals a run should cover, both for generating
/// synthetic inputs and for spotting missing meter readings.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use agile_replay::sim::clock::Clock;
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap();
/// let mut clock = Clock::new(start, end);
/// let mut steps = Vec::new();
///
/// clock.run(|t| steps.push(t));
/// assert_eq!(steps.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Start of the next interval
    current: DateTime<Utc>,
    /// End of the range (exclusive)
    end: DateTime<Utc>,
}

impl Clock {
    /// Creates a clock over `[start, end)`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            current: start,
            end,
        }
    }

    /// Length of one tick.
    pub fn step() -> TimeDelta {
        TimeDelta::minutes(INTERVAL_MINUTES)
    }

    /// Intervals left before the end of the range.
    pub fn remaining(&self) -> usize {
        if self.current >= self.end {
            return 0;
        }
        let minutes = (self.end - self.current).num_minutes();
        usize::try_from((minutes + INTERVAL_MINUTES - 1) / INTERVAL_MINUTES).unwrap_or(0)
    }

    /// Advances the clock by one interval.
    ///
    /// Returns the start of the interval before advancing, or `None` once the
    /// end of the range is reached.
    pub fn tick(&mut self) -> Option<DateTime<Utc>> {
        if self.current < self.end {
            let t = self.current;
            self.current += Self::step();
            Some(t)
        } else {
            None
        }
    }

    /// Runs a function for each remaining interval start.
    pub fn run(&mut self, mut f: impl FnMut(DateTime<Utc>)) {
        while let Some(t) = self.tick() {
            f(t);
        }
    }
}

impl Iterator for Clock {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        self.tick()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).single().expect("valid instant")
    }

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(at(0, 0), at(1, 0));
        assert_eq!(clock.tick(), Some(at(0, 0)));
        assert_eq!(clock.tick(), Some(at(0, 30)));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_remaining() {
        let clock = Clock::new(at(0, 0), at(12, 0));
        assert_eq!(clock.remaining(), 24);
        assert_eq!(Clock::new(at(1, 0), at(0, 0)).remaining(), 0);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(at(3, 0), at(3, 0));
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_| was_called = true);
        assert!(!was_called);
    }

    #[test]
    fn test_iterates_across_midnight() {
        let start = at(23, 0);
        let end = start + TimeDelta::hours(2);
        let ticks: Vec<_> = Clock::new(start, end).collect();
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks[3], at(23, 0) + TimeDelta::minutes(90));
    }
}
