//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tickerlens_core::data::{
    DataError, DataProvider, DataSource, LoadEvent, PriceFields, PriceHistory, ProgressSink,
    RawBar, Sleeper,
};

pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// History with both close fields set to `price`.
pub fn history(ticker: &str, points: &[(NaiveDate, f64)]) -> PriceHistory {
    PriceHistory {
        symbol: ticker.to_string(),
        bars: points
            .iter()
            .map(|(date, price)| RawBar {
                date: *date,
                close: Some(*price),
                adj_close: Some(*price),
            })
            .collect(),
        fields: PriceFields::BOTH,
        source: DataSource::Scripted,
    }
}

pub fn empty(ticker: &str) -> PriceHistory {
    history(ticker, &[])
}

/// Replays queued responses per ticker; an exhausted queue answers with an
/// empty history.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<Result<PriceHistory, DataError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, ticker: &str, response: Result<PriceHistory, DataError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(ticker.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_ok(&self, ticker: &str, points: &[(NaiveDate, f64)]) {
        self.push(ticker, Ok(history(ticker, points)));
    }

    /// Number of fetches made for `ticker`.
    pub fn calls(&self, ticker: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|t| *t == ticker).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Tickers in the order they were fetched.
    pub fn call_order(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(symbol)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(empty(symbol)))
    }
}

/// Records every requested wait instead of sleeping.
#[derive(Default)]
pub struct CountingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl CountingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, delay: Duration) {
        self.waits.lock().unwrap().push(delay);
    }
}

/// Keeps every event for later inspection.
#[derive(Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<LoadEvent>>,
}

impl CollectingProgress {
    pub fn events(&self) -> Vec<LoadEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingProgress {
    fn on_event(&self, event: &LoadEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
