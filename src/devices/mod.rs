//! Modelled household devices: the battery and the solar array.

/// Battery charge state and seasonal charging rules.
pub mod battery;
/// Monthly solar output split and fitted daily curves.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use battery::{BatteryPolicy, BatteryState};
pub use solar::SolarModel;
pub use types::{FixedSolar, SolarSource};
