//! Price-series loading, caching, alignment and export.

pub mod align;
pub mod cache;
pub mod cancel;
pub mod circuit_breaker;
pub mod export;
pub mod frame;
pub mod loader;
pub mod progress;
pub mod provider;
pub mod series;
pub mod sleeper;
pub mod synthetic;
pub mod yahoo;

pub use align::{align_and_normalize, AlignedTable, Alignment, NormalizedTable, PriceTable};
pub use cache::{CacheKey, SeriesCache, DEFAULT_TTL};
pub use cancel::CancelToken;
pub use circuit_breaker::CircuitBreaker;
pub use export::table_csv;
pub use frame::to_dataframe;
pub use loader::{extract_series, LoadOutcome, LoadRequest, TimeSeriesLoader};
pub use progress::{AttemptOutcome, LoadEvent, NoProgress, ProgressSink, TracingProgress};
pub use provider::{DataError, DataProvider, DataSource, PriceField, PriceFields, PriceHistory, RawBar};
pub use series::{RawSeries, SeriesError, Symbol, SymbolSet};
pub use sleeper::{Sleeper, ThreadSleeper};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
