//! Common traits for the modelled devices.

use crate::sim::types::LocalSlot;

/// Source of on-site generation for one interval.
///
/// The engine is generic over this trait so that a fixed profile can stand
/// in for the fitted solar curve.
pub trait SolarSource {
    /// Energy generated during the half hour starting at `slot` (kWh).
    fn generation_kwh(&mut self, slot: &LocalSlot) -> f64;

    /// Returns a human-readable name for the source.
    fn source_type(&self) -> &'static str;
}

/// A source that generates the same energy in every listed local hour.
///
/// Useful for replaying a known generation pattern instead of the monthly
/// bell-curve model.
#[derive(Debug, Clone, Default)]
pub struct FixedSolar {
    /// Generation per half hour, indexed by local hour.
    pub per_hour_kwh: [f64; 24],
}

impl FixedSolar {
    /// No generation at any time.
    pub fn none() -> Self {
        Self::default()
    }

    /// The same generation in every half hour of `hours`.
    pub fn during(hours: impl IntoIterator<Item = u32>, kwh: f64) -> Self {
        let mut per_hour_kwh = [0.0; 24];
        for hour in hours {
            if let Some(slot) = per_hour_kwh.get_mut(hour as usize) {
                *slot = kwh;
            }
        }
        Self { per_hour_kwh }
    }
}

impl SolarSource for FixedSolar {
    fn generation_kwh(&mut self, slot: &LocalSlot) -> f64 {
        self.per_hour_kwh
            .get(slot.hour as usize)
            .copied()
            .unwrap_or(0.0)
    }

    fn source_type(&self) -> &'static str {
        "FixedSolar"
    }
}
