//! Request and series types: display-name/ticker pairs and raw price series.

use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A ticker and the name it is shown under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub ticker: String,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
        }
    }
}

/// Ordered set of symbols for one request.
///
/// Keeps caller order (the loader fetches in this order) and guarantees that
/// both display names and tickers are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
}

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) -> Result<(), ConfigError> {
        if self.symbols.iter().any(|s| s.name == symbol.name) {
            return Err(ConfigError::DuplicateName(symbol.name));
        }
        if let Some(existing) = self.symbols.iter().find(|s| s.ticker == symbol.ticker) {
            return Err(ConfigError::DuplicateTicker {
                ticker: symbol.ticker,
                first: existing.name.clone(),
                second: symbol.name,
            });
        }
        self.symbols.push(symbol);
        Ok(())
    }

    /// Build from `(name, ticker)` pairs, failing on the first duplicate.
    pub fn from_pairs<I, N, T>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let mut set = Self::new();
        for (name, ticker) in pairs {
            set.insert(Symbol::new(name, ticker))?;
        }
        Ok(set)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.name.as_str())
    }

    /// The symbols sorted by (name, ticker), independent of caller order.
    pub fn sorted(&self) -> Vec<Symbol> {
        let mut sorted = self.symbols.clone();
        sorted.sort();
        sorted
    }
}

impl<'a> IntoIterator for &'a SymbolSet {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates not strictly increasing at index {index}: {previous} then {current}")]
    NotIncreasing {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Daily prices for one symbol, dates strictly increasing.
///
/// A price that is not a finite positive number is stored as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    points: Vec<(NaiveDate, Option<f64>)>,
}

fn clean(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

impl RawSeries {
    /// Build from points already in date order. Rejects unsorted or repeated dates.
    pub fn new(points: Vec<(NaiveDate, Option<f64>)>) -> Result<Self, SeriesError> {
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].0 <= pair[0].0 {
                return Err(SeriesError::NotIncreasing {
                    index: index + 1,
                    previous: pair[0].0,
                    current: pair[1].0,
                });
            }
        }
        Ok(Self {
            points: points.into_iter().map(|(d, p)| (d, clean(p))).collect(),
        })
    }

    /// Build from points in any order. A repeated date keeps its last value.
    pub fn from_unsorted(points: impl IntoIterator<Item = (NaiveDate, Option<f64>)>) -> Self {
        let mut points: Vec<_> = points.into_iter().map(|(d, p)| (d, clean(p))).collect();
        // Stable sort keeps arrival order within a date
        points.sort_by_key(|(d, _)| *d);
        let mut deduped: Vec<(NaiveDate, Option<f64>)> = Vec::with_capacity(points.len());
        for (date, price) in points {
            match deduped.last_mut() {
                Some(last) if last.0 == date => last.1 = price,
                _ => deduped.push((date, price)),
            }
        }
        Self { points: deduped }
    }

    pub fn points(&self) -> &[(NaiveDate, Option<f64>)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of dates carrying a price.
    pub fn present_count(&self) -> usize {
        self.points.iter().filter(|(_, p)| p.is_some()).count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }
}
