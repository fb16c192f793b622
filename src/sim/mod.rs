/// Daily totals and their monthly roll-up.
pub mod accumulator;
/// Half-hour clock over a UTC range.
pub mod clock;
pub mod engine;
pub mod kpi;
/// Low/day/peak agile average state machines.
pub mod period;
pub mod types;
