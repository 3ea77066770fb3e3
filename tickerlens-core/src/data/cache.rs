//! In-memory TTL cache of load outcomes.
//!
//! Keyed by the sorted symbol set, the date range and the price field.
//! Entries are immutable once stored and expire by age only; there is no
//! invalidation API. Share one cache between loaders by cloning its `Arc`.

use super::loader::LoadOutcome;
use super::provider::PriceField;
use super::series::{Symbol, SymbolSet};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Default time-to-live: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Identity of a request, independent of the order symbols were given in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    symbols: Vec<Symbol>,
    start: NaiveDate,
    end: NaiveDate,
    field: PriceField,
}

impl CacheKey {
    pub fn new(symbols: &SymbolSet, start: NaiveDate, end: NaiveDate, field: PriceField) -> Self {
        Self {
            symbols: symbols.sorted(),
            start,
            end,
            field,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    outcome: Arc<LoadOutcome>,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

#[derive(Debug)]
pub struct SeriesCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stored outcome for `key` if it is younger than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<LoadOutcome>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.is_fresh(self.ttl))
            .map(|e| Arc::clone(&e.outcome))
    }

    /// Store an outcome unless a fresh one is already there.
    ///
    /// Returns the outcome now held for `key`, so racing writers for the
    /// same key all end up with the first writer's value.
    pub fn insert(&self, key: CacheKey, outcome: LoadOutcome) -> Arc<LoadOutcome> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        entries.retain(|_, e| e.is_fresh(ttl));

        let entry = entries.entry(key).or_insert_with(|| CacheEntry {
            outcome: Arc::new(outcome),
            stored_at: Instant::now(),
        });
        Arc::clone(&entry.outcome)
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, e| e.is_fresh(ttl));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
