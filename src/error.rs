//! Error types for loading inputs and replaying intervals.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;

/// Which agile rate table a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    /// Grid import rates.
    Import,
    /// Grid export rates.
    Export,
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Import => "agile import",
            Self::Export => "agile export",
        })
    }
}

/// Fatal errors of a replay run. None of them leave partial output behind.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("no {table} rate for interval starting {timestamp}")]
    DataGap {
        table: RateKind,
        timestamp: DateTime<Utc>,
    },

    #[error("no {0} data for the requested range")]
    EmptyInput(&'static str),

    #[error("invalid configuration: {}", join_errors(.0))]
    Configuration(Vec<ConfigError>),

    #[error("interval {timestamp} does not follow {previous}")]
    OutOfOrder {
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("cannot read \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse \"{}\": {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_gap_names_table_and_timestamp() {
        let err = SimError::DataGap {
            table: RateKind::Export,
            timestamp: DateTime::<Utc>::MIN_UTC,
        };
        let message = err.to_string();
        assert!(message.starts_with("no agile export rate"));
    }

    #[test]
    fn configuration_error_lists_every_field() {
        let err = SimError::Configuration(vec![
            ConfigError {
                field: "battery.min_kwh".into(),
                message: "must be <= battery.capacity_kwh".into(),
            },
            ConfigError {
                field: "tariff.flux_rate_low".into(),
                message: "must be >= 0".into(),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("battery.min_kwh"));
        assert!(message.contains("tariff.flux_rate_low"));
    }
}
