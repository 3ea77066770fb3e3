//! End to end: config → synthetic load → alignment → exports.

use chrono::NaiveDate;
use std::sync::Arc;
use tickerlens_core::data::{table_csv, to_dataframe, SyntheticProvider, TimeSeriesLoader};
use tickerlens_core::DashboardConfig;

const CONFIG: &str = r#"
start = "2024-01-01"
end = "2024-03-29"

[loader]
max_retries = 2
retry_delay_ms = 0
price_field = "adj_close"

[[symbols]]
name = "Apple"
ticker = "AAPL"

[[symbols]]
name = "NVIDIA"
ticker = "NVDA"
"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[test]
fn synthetic_watchlist_normalizes_to_100() {
    let config = DashboardConfig::from_toml(CONFIG).unwrap();
    let request = config.request(today()).unwrap();
    let loader = TimeSeriesLoader::new(Arc::new(SyntheticProvider::new(42)), config.loader.clone());

    let outcome = loader.load(&request);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.successes.len(), 2);

    let alignment = outcome.align();
    // Q1 2024 has 65 weekdays
    assert_eq!(alignment.raw.height(), 65);
    for name in ["Apple", "NVIDIA"] {
        let column = alignment.normalized.column(name).unwrap();
        assert!((column[0].unwrap() - 100.0).abs() < 1e-9);
        assert!(column.iter().all(|c| c.is_some()));
    }
}

#[test]
fn same_seed_same_dataset_hash() {
    let config = DashboardConfig::from_toml(CONFIG).unwrap();
    let request = config.request(today()).unwrap();

    let a = TimeSeriesLoader::new(Arc::new(SyntheticProvider::new(1)), config.loader.clone())
        .load(&request);
    let b = TimeSeriesLoader::new(Arc::new(SyntheticProvider::new(1)), config.loader.clone())
        .load(&request);
    let c = TimeSeriesLoader::new(Arc::new(SyntheticProvider::new(2)), config.loader.clone())
        .load(&request);

    assert_eq!(a.dataset_hash(), b.dataset_hash());
    assert_ne!(a.dataset_hash(), c.dataset_hash());
}

#[test]
fn exports_agree_on_shape() {
    let config = DashboardConfig::from_toml(CONFIG).unwrap();
    let request = config.request(today()).unwrap();
    let alignment = TimeSeriesLoader::new(Arc::new(SyntheticProvider::new(9)), config.loader)
        .load(&request)
        .align();

    let csv = table_csv(&alignment.normalized).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "date,Apple,NVIDIA");
    assert_eq!(lines.len(), alignment.normalized.height() + 1);
    assert!(lines[1].starts_with("2024-01-01,100.000000,100.000000"));

    let df = to_dataframe(&alignment.raw).unwrap();
    assert_eq!(df.height(), alignment.raw.height());
    assert_eq!(df.width(), 3);
}
