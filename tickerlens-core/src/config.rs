//! Loader settings and the watch-list config file.
//!
//! Every setting the loader reads arrives through `LoaderConfig`; nothing is
//! read from globals or the environment. `DashboardConfig` is the TOML file
//! format that produces a `LoadRequest` plus a `LoaderConfig`.

use crate::data::loader::LoadRequest;
use crate::data::provider::PriceField;
use crate::data::series::{Symbol, SymbolSet};
use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default lookback when no start date is configured.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 3 * 365;

/// Retry, field and cache settings for `TimeSeriesLoader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Attempts per symbol, first one included.
    pub max_retries: u32,
    /// Fixed wait between attempts.
    pub retry_delay_ms: u64,
    pub price_field: PriceField,
    /// Read the other closing price when the requested one is absent.
    pub field_fallback: bool,
    pub cache_ttl_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            price_field: PriceField::AdjClose,
            field_fallback: true,
            cache_ttl_secs: 60 * 60,
        }
    }
}

impl LoaderConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidLoader(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidLoader(
                "cache_ttl_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A watch list with its date range and loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Defaults to `end` minus three years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Defaults to today.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub loader: LoaderConfig,
    pub symbols: Vec<Symbol>,
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Five large-cap US stocks.
    pub fn default_watchlist() -> Self {
        let symbols = [
            ("Apple", "AAPL"),
            ("Microsoft", "MSFT"),
            ("Alphabet (Google)", "GOOGL"),
            ("Amazon", "AMZN"),
            ("NVIDIA", "NVDA"),
        ]
        .into_iter()
        .map(|(name, ticker)| Symbol::new(name, ticker))
        .collect();

        Self {
            start: None,
            end: None,
            loader: LoaderConfig::default(),
            symbols,
        }
    }

    pub fn symbol_set(&self) -> Result<SymbolSet, ConfigError> {
        let mut set = SymbolSet::new();
        for symbol in &self.symbols {
            set.insert(symbol.clone())?;
        }
        Ok(set)
    }

    /// Resolve the configured range against `today`.
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        let end = self.end.unwrap_or(today);
        let start = self
            .start
            .unwrap_or_else(|| end - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS));
        if start > end {
            return Err(ConfigError::InvalidRange { start, end });
        }
        Ok((start, end))
    }

    pub fn request(&self, today: NaiveDate) -> Result<LoadRequest, ConfigError> {
        let symbols = self.symbol_set()?;
        let (start, end) = self.date_range(today)?;
        Ok(LoadRequest::new(symbols, start, end))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Empty("symbol list"));
        }
        self.symbol_set()?;
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ConfigError::InvalidRange { start, end });
            }
        }
        self.loader.validate()
    }
}
