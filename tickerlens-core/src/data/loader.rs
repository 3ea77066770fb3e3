//! Multi-symbol loader: fetch each ticker with bounded fixed-delay retries and
//! gather the usable series by display name.
//!
//! Nothing here returns an error. A symbol either lands in `successes` or in
//! `failures`; per-attempt errors only surface as progress events.

use super::align::{align_and_normalize, Alignment};
use super::cache::{CacheKey, SeriesCache};
use super::cancel::CancelToken;
use super::progress::{AttemptOutcome, LoadEvent, NoProgress, ProgressSink};
use super::provider::{DataError, DataProvider, PriceField, PriceHistory};
use super::series::{RawSeries, Symbol, SymbolSet};
use super::sleeper::{Sleeper, ThreadSleeper};
use crate::config::LoaderConfig;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// What to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub symbols: SymbolSet,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LoadRequest {
    pub fn new(symbols: SymbolSet, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbols,
            start,
            end,
        }
    }
}

/// Result of a load. Every requested display name is in exactly one of
/// `successes` and `failures`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutcome {
    pub successes: BTreeMap<String, RawSeries>,
    pub failures: BTreeSet<String>,
    /// The load stopped early; unattempted names are in `failures`.
    pub cancelled: bool,
}

impl LoadOutcome {
    /// True when no symbol produced data.
    pub fn is_empty(&self) -> bool {
        self.successes.is_empty()
    }

    /// BLAKE3 over the loaded series, hex encoded. Equal data gives equal hashes.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (name, series) in &self.successes {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
            for (date, price) in series.points() {
                hasher.update(date.to_string().as_bytes());
                match price {
                    Some(p) => hasher.update(&p.to_le_bytes()),
                    None => hasher.update(b"-"),
                };
            }
            hasher.update(&[0xff]);
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn align(&self) -> Alignment {
        align_and_normalize(&self.successes)
    }
}

/// Pick the configured price field out of a provider response.
///
/// With `fallback`, a response lacking the preferred field is read from the
/// other closing price instead. Fails on an empty response or when no usable
/// field is present. A present field whose values are all null yields an
/// all-missing series.
pub fn extract_series(
    history: &PriceHistory,
    field: PriceField,
    fallback: bool,
) -> Result<RawSeries, DataError> {
    if history.is_empty() {
        return Err(DataError::EmptyHistory {
            symbol: history.symbol.clone(),
        });
    }

    let chosen = if history.fields.contains(field) {
        field
    } else {
        let other = match field {
            PriceField::Close => PriceField::AdjClose,
            PriceField::AdjClose => PriceField::Close,
        };
        if fallback && history.fields.contains(other) {
            tracing::debug!(symbol = %history.symbol, %field, %other, "price field absent, using fallback");
            other
        } else {
            return Err(DataError::MissingField {
                symbol: history.symbol.clone(),
                field,
            });
        }
    };

    Ok(RawSeries::from_unsorted(
        history.bars.iter().map(|b| (b.date, b.price(chosen))),
    ))
}

impl From<&DataError> for AttemptOutcome {
    fn from(err: &DataError) -> Self {
        match err {
            DataError::EmptyHistory { .. } => AttemptOutcome::Empty,
            DataError::MissingField { .. } => AttemptOutcome::MissingField,
            other => AttemptOutcome::Error(other.to_string()),
        }
    }
}

enum SymbolResult {
    Loaded(RawSeries),
    Exhausted,
    Cancelled,
}

/// Fetches a symbol set through a `DataProvider`.
pub struct TimeSeriesLoader {
    provider: Arc<dyn DataProvider>,
    config: LoaderConfig,
    sleeper: Arc<dyn Sleeper>,
    progress: Arc<dyn ProgressSink>,
    cache: Option<Arc<SeriesCache>>,
}

impl TimeSeriesLoader {
    pub fn new(provider: Arc<dyn DataProvider>, config: LoaderConfig) -> Self {
        Self {
            provider,
            config,
            sleeper: Arc::new(ThreadSleeper),
            progress: Arc::new(NoProgress),
            cache: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Attach a cache shared with other loaders. Its own TTL applies.
    pub fn with_cache(mut self, cache: Arc<SeriesCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a private cache whose TTL is `LoaderConfig::cache_ttl_secs`.
    pub fn with_configured_cache(self) -> Self {
        let cache = Arc::new(SeriesCache::new(self.config.cache_ttl()));
        self.with_cache(cache)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Load every symbol in caller order.
    pub fn load(&self, request: &LoadRequest) -> LoadOutcome {
        self.load_with_cancel(request, &CancelToken::new())
    }

    /// Sequential load that stops at the next attempt or retry wait once
    /// `cancel` trips. Series already loaded are kept.
    pub fn load_with_cancel(&self, request: &LoadRequest, cancel: &CancelToken) -> LoadOutcome {
        if let Some(hit) = self.cached(request) {
            return hit;
        }

        let symbols: Vec<&Symbol> = request.symbols.iter().collect();
        let total = symbols.len();
        self.emit(LoadEvent::BatchStarted {
            total,
            start: request.start,
            end: request.end,
        });

        let mut outcome = LoadOutcome::default();
        for (index, symbol) in symbols.iter().enumerate() {
            match self.load_symbol(symbol, request, cancel, index, total) {
                SymbolResult::Loaded(series) => {
                    outcome.successes.insert(symbol.name.clone(), series);
                }
                SymbolResult::Exhausted => {
                    outcome.failures.insert(symbol.name.clone());
                }
                SymbolResult::Cancelled => {
                    let rest = &symbols[index..];
                    outcome
                        .failures
                        .extend(rest.iter().map(|s| s.name.clone()));
                    outcome.cancelled = true;
                    self.emit(LoadEvent::Cancelled {
                        remaining: rest.len(),
                    });
                    break;
                }
            }
        }

        self.finish(request, outcome)
    }

    /// Fetch symbols concurrently on the rayon pool.
    ///
    /// Retries and waits stay per symbol, so the outcome matches `load` for
    /// the same upstream state. Progress events interleave across symbols.
    pub fn load_parallel(&self, request: &LoadRequest, cancel: &CancelToken) -> LoadOutcome {
        if let Some(hit) = self.cached(request) {
            return hit;
        }

        let symbols: Vec<&Symbol> = request.symbols.iter().collect();
        let total = symbols.len();
        self.emit(LoadEvent::BatchStarted {
            total,
            start: request.start,
            end: request.end,
        });

        let results: Vec<(&Symbol, SymbolResult)> = symbols
            .par_iter()
            .enumerate()
            .map(|(index, symbol)| {
                (*symbol, self.load_symbol(symbol, request, cancel, index, total))
            })
            .collect();

        let mut outcome = LoadOutcome::default();
        let mut cancelled = 0;
        for (symbol, result) in results {
            match result {
                SymbolResult::Loaded(series) => {
                    outcome.successes.insert(symbol.name.clone(), series);
                }
                SymbolResult::Exhausted => {
                    outcome.failures.insert(symbol.name.clone());
                }
                SymbolResult::Cancelled => {
                    outcome.failures.insert(symbol.name.clone());
                    cancelled += 1;
                }
            }
        }
        if cancelled > 0 {
            outcome.cancelled = true;
            self.emit(LoadEvent::Cancelled {
                remaining: cancelled,
            });
        }

        self.finish(request, outcome)
    }

    fn cache_key(&self, request: &LoadRequest) -> CacheKey {
        CacheKey::new(
            &request.symbols,
            request.start,
            request.end,
            self.config.price_field,
        )
    }

    fn cached(&self, request: &LoadRequest) -> Option<LoadOutcome> {
        let cache = self.cache.as_ref()?;
        let hit = cache.get(&self.cache_key(request))?;
        self.emit(LoadEvent::CacheHit {
            total: request.symbols.len(),
        });
        Some((*hit).clone())
    }

    fn finish(&self, request: &LoadRequest, outcome: LoadOutcome) -> LoadOutcome {
        let succeeded = outcome.successes.len();
        let failed = outcome.failures.len();
        self.emit(LoadEvent::BatchFinished {
            succeeded,
            failed,
            total: succeeded + failed,
        });
        if succeeded == 0 && failed > 0 {
            tracing::warn!(failed, "no symbol produced data");
        }

        match &self.cache {
            // Cancelled loads depend on timing, not on upstream data
            Some(cache) if !outcome.cancelled => {
                let stored = cache.insert(self.cache_key(request), outcome);
                (*stored).clone()
            }
            _ => outcome,
        }
    }

    fn load_symbol(
        &self,
        symbol: &Symbol,
        request: &LoadRequest,
        cancel: &CancelToken,
        index: usize,
        total: usize,
    ) -> SymbolResult {
        if cancel.is_cancelled() {
            return SymbolResult::Cancelled;
        }

        self.emit(LoadEvent::SymbolStarted {
            name: symbol.name.clone(),
            ticker: symbol.ticker.clone(),
            index,
            total,
        });

        let max_attempts = self.config.max_retries.max(1);
        let delay = self.config.retry_delay();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return SymbolResult::Cancelled;
            }

            let result = self
                .provider
                .fetch(&symbol.ticker, request.start, request.end)
                .and_then(|history| {
                    extract_series(&history, self.config.price_field, self.config.field_fallback)
                });

            match result {
                Ok(series) => {
                    self.emit(LoadEvent::Attempt {
                        name: symbol.name.clone(),
                        attempt,
                        max_attempts,
                        outcome: AttemptOutcome::Success {
                            points: series.present_count(),
                        },
                    });
                    self.emit(LoadEvent::SymbolFinished {
                        name: symbol.name.clone(),
                        succeeded: true,
                        attempts: attempt,
                    });
                    return SymbolResult::Loaded(series);
                }
                Err(err) => {
                    self.emit(LoadEvent::Attempt {
                        name: symbol.name.clone(),
                        attempt,
                        max_attempts,
                        outcome: AttemptOutcome::from(&err),
                    });
                }
            }

            if attempt < max_attempts {
                if cancel.is_cancelled() || cancel.would_expire_during(delay) {
                    return SymbolResult::Cancelled;
                }
                self.emit(LoadEvent::RetryScheduled {
                    name: symbol.name.clone(),
                    attempt,
                    delay,
                });
                self.sleeper.sleep(delay);
            }
        }

        tracing::warn!(name = %symbol.name, ticker = %symbol.ticker, max_attempts, "retries exhausted");
        self.emit(LoadEvent::SymbolFinished {
            name: symbol.name.clone(),
            succeeded: false,
            attempts: max_attempts,
        });
        SymbolResult::Exhausted
    }

    fn emit(&self, event: LoadEvent) {
        self.progress.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, PriceFields, RawBar};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn history(fields: PriceFields, bars: Vec<RawBar>) -> PriceHistory {
        PriceHistory {
            symbol: "AAA".into(),
            bars,
            fields,
            source: DataSource::Scripted,
        }
    }

    fn bar(day: u32, close: Option<f64>, adj_close: Option<f64>) -> RawBar {
        RawBar {
            date: d(day),
            close,
            adj_close,
        }
    }

    #[test]
    fn extract_uses_requested_field() {
        let h = history(
            PriceFields::BOTH,
            vec![bar(2, Some(10.0), Some(9.0)), bar(3, Some(11.0), Some(10.0))],
        );
        let series = extract_series(&h, PriceField::AdjClose, false).unwrap();
        assert_eq!(series.points(), &[(d(2), Some(9.0)), (d(3), Some(10.0))]);
    }

    #[test]
    fn extract_rejects_empty_history() {
        let h = history(PriceFields::BOTH, vec![]);
        assert!(matches!(
            extract_series(&h, PriceField::Close, true),
            Err(DataError::EmptyHistory { .. })
        ));
    }

    #[test]
    fn extract_missing_field_without_fallback_fails() {
        let fields = PriceFields {
            close: true,
            adj_close: false,
        };
        let h = history(fields, vec![bar(2, Some(10.0), None)]);
        assert!(matches!(
            extract_series(&h, PriceField::AdjClose, false),
            Err(DataError::MissingField {
                field: PriceField::AdjClose,
                ..
            })
        ));
    }

    #[test]
    fn extract_missing_field_with_fallback_reads_other() {
        let fields = PriceFields {
            close: true,
            adj_close: false,
        };
        let h = history(fields, vec![bar(2, Some(10.0), None)]);
        let series = extract_series(&h, PriceField::AdjClose, true).unwrap();
        assert_eq!(series.points(), &[(d(2), Some(10.0))]);
    }

    #[test]
    fn extract_neither_field_fails_even_with_fallback() {
        let h = history(PriceFields::default(), vec![bar(2, Some(10.0), None)]);
        assert!(extract_series(&h, PriceField::Close, true).is_err());
    }

    #[test]
    fn extract_all_null_values_is_all_missing_series() {
        let h = history(
            PriceFields::BOTH,
            vec![bar(2, Some(1.0), None), bar(3, Some(2.0), None)],
        );
        // The field is present, so no fallback to close happens
        let series = extract_series(&h, PriceField::AdjClose, true).unwrap();
        assert_eq!(series.points(), &[(d(2), None), (d(3), None)]);
        assert_eq!(series.present_count(), 0);
    }

    #[test]
    fn attempt_outcome_from_error() {
        assert_eq!(
            AttemptOutcome::from(&DataError::EmptyHistory {
                symbol: "A".into()
            }),
            AttemptOutcome::Empty
        );
        assert!(matches!(
            AttemptOutcome::from(&DataError::NetworkUnreachable("down".into())),
            AttemptOutcome::Error(msg) if msg.contains("down")
        ));
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let mut a = LoadOutcome::default();
        a.successes.insert(
            "A".into(),
            RawSeries::new(vec![(d(2), Some(1.0))]).unwrap(),
        );
        let mut b = a.clone();
        assert_eq!(a.dataset_hash(), b.dataset_hash());

        b.successes.insert(
            "A".into(),
            RawSeries::new(vec![(d(2), Some(2.0))]).unwrap(),
        );
        assert_ne!(a.dataset_hash(), b.dataset_hash());

        let before = b.dataset_hash();
        b.failures.insert("B".into());
        assert_eq!(b.dataset_hash(), before);
        assert_eq!(before.len(), 64);
    }
}
