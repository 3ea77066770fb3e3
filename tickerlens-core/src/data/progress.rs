//! Structured progress events emitted by the loader.
//!
//! The loader never prints. A presentation layer subscribes by passing a
//! `ProgressSink`: a log renderer, a channel to a UI thread, or nothing.

use chrono::NaiveDate;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Outcome of a single fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Usable series with this many priced dates.
    Success { points: usize },
    /// The provider answered with no rows.
    Empty,
    /// Rows came back without the requested price field.
    MissingField,
    /// The provider call itself failed.
    Error(String),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }
}

/// One step of a load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    BatchStarted {
        total: usize,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Outcome served from the cache; no fetches follow.
    CacheHit { total: usize },
    SymbolStarted {
        name: String,
        ticker: String,
        index: usize,
        total: usize,
    },
    Attempt {
        name: String,
        attempt: u32,
        max_attempts: u32,
        outcome: AttemptOutcome,
    },
    RetryScheduled {
        name: String,
        attempt: u32,
        delay: Duration,
    },
    SymbolFinished {
        name: String,
        succeeded: bool,
        attempts: u32,
    },
    Cancelled { remaining: usize },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        total: usize,
    },
}

/// Receiver of load events. Must tolerate calls from several threads.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &LoadEvent);
}

/// Discards every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: &LoadEvent) {}
}

/// Renders events as `tracing` log lines.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_event(&self, event: &LoadEvent) {
        match event {
            LoadEvent::BatchStarted { total, start, end } => {
                tracing::info!(total, %start, %end, "loading price series");
            }
            LoadEvent::CacheHit { total } => {
                tracing::info!(total, "served from cache");
            }
            LoadEvent::SymbolStarted {
                name,
                ticker,
                index,
                total,
            } => {
                tracing::info!("[{}/{}] fetching {name} ({ticker})", index + 1, total);
            }
            LoadEvent::Attempt {
                name,
                attempt,
                max_attempts,
                outcome,
            } => match outcome {
                AttemptOutcome::Success { points } => {
                    tracing::debug!(%name, attempt, points, "attempt succeeded");
                }
                AttemptOutcome::Error(reason) => {
                    tracing::debug!(%name, attempt, max_attempts, %reason, "attempt failed");
                }
                other => {
                    tracing::debug!(%name, attempt, max_attempts, outcome = ?other, "attempt failed");
                }
            },
            LoadEvent::RetryScheduled {
                name,
                attempt,
                delay,
            } => {
                tracing::debug!(%name, attempt, delay_ms = delay.as_millis() as u64, "retrying");
            }
            LoadEvent::SymbolFinished {
                name,
                succeeded,
                attempts,
            } => {
                if *succeeded {
                    tracing::info!("  OK: {name}");
                } else {
                    tracing::warn!("  FAIL: {name} after {attempts} attempts");
                }
            }
            LoadEvent::Cancelled { remaining } => {
                tracing::warn!(remaining, "load cancelled");
            }
            LoadEvent::BatchFinished {
                succeeded,
                failed,
                total,
            } => {
                tracing::info!("load complete: {succeeded}/{total} succeeded, {failed} failed");
            }
        }
    }
}

/// Forwards events to another thread. A closed receiver is ignored.
impl ProgressSink for Sender<LoadEvent> {
    fn on_event(&self, event: &LoadEvent) {
        let _ = self.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn channel_sink_forwards_events() {
        let (tx, rx) = mpsc::channel();
        tx.on_event(&LoadEvent::CacheHit { total: 2 });
        assert_eq!(rx.recv().unwrap(), LoadEvent::CacheHit { total: 2 });
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::channel::<LoadEvent>();
        drop(rx);
        tx.on_event(&LoadEvent::Cancelled { remaining: 1 });
    }

    #[test]
    fn success_outcome_flag() {
        assert!(AttemptOutcome::Success { points: 3 }.is_success());
        assert!(!AttemptOutcome::Empty.is_success());
    }
}
