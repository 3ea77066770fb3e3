//! Errors for the configuration surface.
//!
//! Loading and alignment never fail; everything that can go wrong there is a
//! value in their return types. What remains fallible is building the inputs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("duplicate display name '{0}'")]
    DuplicateName(String),

    #[error("duplicate ticker '{ticker}' (used by '{first}' and '{second}')")]
    DuplicateTicker {
        ticker: String,
        first: String,
        second: String,
    },

    #[error("empty {0}")]
    Empty(&'static str),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid loader setting: {0}")]
    InvalidLoader(String),
}
