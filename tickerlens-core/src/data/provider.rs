//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Yahoo Finance, the
//! synthetic generator) so the loader can retry any of them and tests can
//! script responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily row from a data provider, before field selection.
///
/// A `None` means the provider returned the field name but no value for
/// this date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
}

impl RawBar {
    /// Value of the requested price field on this row.
    pub fn price(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
        }
    }
}

/// Which closing price the loader extracts from each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Raw exchange close.
    Close,
    /// Split- and dividend-adjusted close.
    #[default]
    AdjClose,
}

impl PriceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Close => "close",
            PriceField::AdjClose => "adj_close",
        }
    }
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field names present in a provider response, independent of per-row nulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceFields {
    pub close: bool,
    pub adj_close: bool,
}

impl PriceFields {
    pub const BOTH: PriceFields = PriceFields {
        close: true,
        adj_close: true,
    };

    pub fn contains(&self, field: PriceField) -> bool {
        match field {
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
        }
    }
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in both log lines and CLI output.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("empty price history for {symbol}")]
    EmptyHistory { symbol: String },

    #[error("price field '{field}' missing from response for {symbol}")]
    MissingField { symbol: String, field: PriceField },

    #[error("export error: {0}")]
    Export(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a single fetch for one ticker.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub fields: PriceFields,
    pub source: DataSource,
}

impl PriceHistory {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Synthetic,
    Scripted,
}

/// Trait for price providers.
///
/// A call to `fetch` is exactly one attempt; retry policy lives in the
/// loader, and the cache sits above it. Providers know about neither.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a ticker over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError>;
}
