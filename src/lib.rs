//! Half-hourly replay of home battery and solar costs under agile and flux tariffs.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
/// Input loading, CSV ledger export and sink points.
pub mod io;
pub mod reporting;
pub mod runner;
/// Replay engine, accumulators and reports.
pub mod sim;
pub mod synthetic;
pub mod tariff;
