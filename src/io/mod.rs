//! Input loading and result export.

/// CSV export of the interval ledger.
pub mod export;
pub mod input;
/// JSON points for the time-series sink.
pub mod points;
