//! TickerLens Core — historical price loading for comparison dashboards.
//!
//! This crate turns a watch list of (display name, ticker) pairs and a date
//! range into aligned and normalized price tables:
//! - Provider trait with Yahoo Finance and synthetic implementations
//! - Loader with fixed-delay bounded retries, cancellation and progress events
//! - In-memory TTL cache of load outcomes
//! - Outer-join alignment and rebasing to 100
//! - CSV and Polars exports for the presentation layer

pub mod config;
pub mod data;
pub mod error;

pub use config::{DashboardConfig, LoaderConfig};
pub use error::ConfigError;
