//! Synthetic price provider for offline runs and benchmarks.
//!
//! Generates weekday bars with a seeded random walk. The same seed, ticker and
//! range always give the same bars. Results are tagged `DataSource::Synthetic`.

use super::provider::{DataError, DataProvider, DataSource, PriceFields, PriceHistory, RawBar};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SyntheticProvider {
    seed: u64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Bars for every weekday in `[start, end]`.
    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
        let mut rng = self.rng_for(symbol);
        let mut price: f64 = rng.gen_range(20.0..500.0);
        // Dividends pull the adjusted series slightly below the raw close
        let adj_factor: f64 = rng.gen_range(0.95..1.0);

        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|date| {
                let ret: f64 = rng.gen_range(-0.02..0.0206);
                price = (price * (1.0 + ret)).max(0.01);
                let close = (price * 100.0).round() / 100.0;
                RawBar {
                    date,
                    close: Some(close),
                    adj_close: Some(close * adj_factor),
                }
            })
            .collect()
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        Ok(PriceHistory {
            symbol: symbol.to_string(),
            bars: self.generate(symbol, start, end),
            fields: PriceFields::BOTH,
            source: DataSource::Synthetic,
        })
    }
}
