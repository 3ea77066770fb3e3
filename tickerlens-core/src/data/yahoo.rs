//! Yahoo Finance data provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API. One `fetch` is one HTTP
//! request: retries belong to the loader. The circuit breaker is consulted
//! before every request and fed with the response status.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes, so every parse failure maps to `ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, DataSource, PriceFields, PriceHistory, RawBar};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SECONDS_PER_DAY: i64 = 86_400;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Self::with_timeout(circuit_breaker, Duration::from_secs(30))
    }

    pub fn with_timeout(
        circuit_breaker: Arc<CircuitBreaker>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
        })
    }

    /// Chart API URL for a ticker and an inclusive date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<reqwest::Url, DataError> {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + SECONDS_PER_DAY - 1;

        let mut url = reqwest::Url::parse(CHART_URL)
            .map_err(|e| DataError::Other(format!("invalid chart url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| DataError::Other("chart url cannot hold a path".into()))?
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &start_ts.to_string())
            .append_pair("period2", &end_ts.to_string())
            .append_pair("interval", "1d")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    /// Parse the chart API response into a price history.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceHistory, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // No trading days in range: Yahoo omits the timestamp array entirely.
        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let closes = quote.close;
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let fields = PriceFields {
            close: closes.is_some(),
            adj_close: adj_closes.is_some(),
        };

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = closes.as_ref().and_then(|v| v.get(i).copied().flatten());
            let adj_close = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());

            // Holidays come back as rows of nulls
            if close.is_none() && adj_close.is_none() {
                continue;
            }

            bars.push(RawBar {
                date,
                close,
                adj_close,
            });
        }

        Ok(PriceHistory {
            symbol: symbol.to_string(),
            bars,
            fields,
            source: DataSource::YahooFinance,
        })
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, start, end)?;
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                self.circuit_breaker.record_failure();
            }
            DataError::NetworkUnreachable(e.to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            ));
        }
        // A 404 still carries a chart error body naming the symbol
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let history = Self::parse_response(symbol, chart)?;
        self.circuit_breaker.record_success();
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(symbol: &str, json: &str) -> Result<PriceHistory, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response(symbol, resp)
    }

    // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
    const THREE_DAYS: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "AAPL"},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open": [187.1, 184.2, 182.1],
                        "close": [185.64, 184.25, null],
                        "volume": [82488700, 58414500, 71983600]
                    }],
                    "adjclose": [{"adjclose": [184.73, 183.35, 180.91]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_close_and_adjclose() {
        let history = parse("AAPL", THREE_DAYS).unwrap();
        assert_eq!(history.bars.len(), 3);
        assert_eq!(history.fields, PriceFields::BOTH);
        assert_eq!(
            history.bars[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(history.bars[0].close, Some(185.64));
        assert_eq!(history.bars[1].adj_close, Some(183.35));
        assert_eq!(history.bars[2].close, None);
        assert_eq!(history.bars[2].adj_close, Some(180.91));
        assert_eq!(history.source, DataSource::YahooFinance);
    }

    #[test]
    fn missing_adjclose_indicator_is_reported() {
        let json = r#"{"chart": {"result": [{
            "timestamp": [1704205800],
            "indicators": {"quote": [{"close": [185.64]}]}
        }], "error": null}}"#;
        let history = parse("AAPL", json).unwrap();
        assert!(history.fields.close);
        assert!(!history.fields.adj_close);
        assert_eq!(history.bars[0].adj_close, None);
    }

    #[test]
    fn null_rows_are_skipped() {
        let json = r#"{"chart": {"result": [{
            "timestamp": [1704205800, 1704292200],
            "indicators": {
                "quote": [{"close": [null, 184.25]}],
                "adjclose": [{"adjclose": [null, 183.35]}]
            }
        }], "error": null}}"#;
        let history = parse("AAPL", json).unwrap();
        assert_eq!(history.bars.len(), 1);
        assert_eq!(history.bars[0].close, Some(184.25));
    }

    #[test]
    fn no_timestamps_is_empty_history() {
        let json = r#"{"chart": {"result": [{
            "indicators": {"quote": [{}], "adjclose": [{"adjclose": []}]}
        }], "error": null}}"#;
        let history = parse("AAPL", json).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart": {"result": null, "error": {
            "code": "Not Found", "description": "No data found, symbol may be delisted"
        }}}"#;
        match parse("NOPE", json) {
            Err(DataError::SymbolNotFound { symbol }) => assert_eq!(symbol, "NOPE"),
            other => panic!("expected SymbolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn other_chart_error_is_format_change() {
        let json = r#"{"chart": {"result": null, "error": {
            "code": "Bad Request", "description": "Invalid input"
        }}}"#;
        assert!(matches!(
            parse("AAPL", json),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn chart_url_carries_symbol_and_inclusive_range() {
        let url = YahooProvider::chart_url(
            "BRK-A",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
        .unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://query2.finance.yahoo.com/v8/finance/chart/BRK-A?"));
        assert!(s.contains("period1=1704153600"));
        assert!(s.contains("period2=1704239999"));
        assert!(s.contains("interval=1d"));
    }
}
