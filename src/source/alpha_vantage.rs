//! Alpha Vantage daily time series source
//!
//! Requests the full `TIME_SERIES_DAILY` history and keeps the most recent
//! `lookback_years` calendar years. The intraday range comes from the newest
//! daily record; the day change is derived from the last two closes.

use super::{window_cutoff, with_timeout, PriceHistorySource};
use crate::errors::{CalculatorError, Result};
use crate::types::{DailyBar, PriceHistory};
use chrono::{Local, NaiveDate};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "alpha_vantage";
const SERIES_KEY: &str = "Time Series (Daily)";

/// Keys Alpha Vantage uses to report errors and rate limits inside a 200 response
const UPSTREAM_MESSAGE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

#[derive(Debug, Clone)]
pub struct AlphaVantageSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    lookback_years: u32,
    timeout: Duration,
}

impl AlphaVantageSource {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: crate::config::DEFAULT_ALPHA_VANTAGE_URL.to_string(),
            api_key: api_key.to_string(),
            lookback_years: 2,
            timeout: Duration::from_secs(30),
        }
    }

    /// Point the source at another host (tests, proxies)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_lookback_years(mut self, years: u32) -> Self {
        self.lookback_years = years;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request_series(&self, symbol: &str) -> Result<Value> {
        let url = format!("{}/query", self.base_url);
        debug!(provider = PROVIDER, symbol, "requesting daily time series");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }
}

impl PriceHistorySource for AlphaVantageSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn fetch_history<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<PriceHistory>> {
        async move {
            let body = with_timeout(self.timeout, self.request_series(symbol)).await?;
            let cutoff = window_cutoff(Local::now().date_naive(), self.lookback_years);
            parse_time_series(symbol, &body, cutoff)
        }
        .boxed()
    }
}

/// Turn a `TIME_SERIES_DAILY` response body into a windowed history
pub fn parse_time_series(symbol: &str, body: &Value, cutoff: NaiveDate) -> Result<PriceHistory> {
    for key in UPSTREAM_MESSAGE_KEYS {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            warn!(provider = PROVIDER, symbol, key, message, "upstream rejected request");
            return Err(CalculatorError::Upstream {
                provider: PROVIDER,
                message: Some(message.to_string()),
            });
        }
    }

    let series = body
        .get(SERIES_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| CalculatorError::MissingData {
            provider: PROVIDER,
            detail: preview(body),
        })?;

    let bars = parse_bars(series)?;
    let history = PriceHistory::from_daily_bars(symbol, bars, cutoff).ok_or_else(|| {
        CalculatorError::MissingData {
            provider: PROVIDER,
            detail: format!("empty time series for {}", symbol),
        }
    })?;

    debug!(
        provider = PROVIDER,
        symbol,
        closes = history.len(),
        start = ?history.start_date,
        end = ?history.end_date,
        "parsed daily time series"
    );
    Ok(history)
}

fn parse_bars(series: &Map<String, Value>) -> Result<Vec<DailyBar>> {
    series
        .iter()
        .map(|(date, record)| -> Result<DailyBar> {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| CalculatorError::MissingData {
                provider: PROVIDER,
                detail: format!("invalid date {:?}: {}", date, e),
            })?;
            Ok(DailyBar {
                date,
                open: field(record, "1. open", date)?,
                high: field(record, "2. high", date)?,
                low: field(record, "3. low", date)?,
                close: field(record, "4. close", date)?,
            })
        })
        .collect()
}

fn field(record: &Value, key: &str, date: NaiveDate) -> Result<f64> {
    record
        .get(key)
        .and_then(|value| match value {
            Value::String(text) => text.trim().parse::<f64>().ok(),
            Value::Number(number) => number.as_f64(),
            _ => None,
        })
        .ok_or_else(|| CalculatorError::MissingData {
            provider: PROVIDER,
            detail: format!("missing or invalid {:?} on {}", key, date),
        })
}

/// Compact, bounded rendering of an unexpected response body
fn preview(body: &Value) -> String {
    let text = body.to_string();
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn sample_body() -> Value {
        json!({
            "Meta Data": { "2. Symbol": "SOXL" },
            "Time Series (Daily)": {
                "2024-03-05": { "1. open": "40.0", "2. high": "42.5", "3. low": "39.1", "4. close": "41.0", "5. volume": "100" },
                "2024-03-04": { "1. open": "39.0", "2. high": "40.5", "3. low": "38.0", "4. close": "40.0", "5. volume": "100" },
                "2024-03-01": { "1. open": "37.0", "2. high": "39.5", "3. low": "36.0", "4. close": "38.0", "5. volume": "100" },
                "2023-12-29": { "1. open": "30.0", "2. high": "31.0", "3. low": "29.0", "4. close": "30.5", "5. volume": "100" }
            }
        })
    }

    #[test]
    fn test_parse_windows_and_orders() {
        let history = parse_time_series("SOXL", &sample_body(), cutoff()).unwrap();

        assert_eq!(history.closes, vec![41.0, 40.0, 38.0]);
        assert_eq!(history.day_high, 42.5);
        assert_eq!(history.day_low, 39.1);
        assert_eq!(history.day_change_pct, None);
        assert_eq!(history.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(history.end_date, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_error_message_is_literal() {
        let body = json!({ "Error Message": "Invalid API call. Please retry or visit the documentation." });
        match parse_time_series("NOPE", &body, cutoff()) {
            Err(CalculatorError::Upstream { message, .. }) => {
                assert_eq!(message.as_deref(), Some("Invalid API call. Please retry or visit the documentation."))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_note() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute." });
        assert!(matches!(
            parse_time_series("SOXL", &body, cutoff()),
            Err(CalculatorError::Upstream { message: Some(_), .. })
        ));

        let body = json!({ "Information": "We have detected your API key as ... rate limit" });
        assert!(matches!(
            parse_time_series("SOXL", &body, cutoff()),
            Err(CalculatorError::Upstream { .. })
        ));
    }

    #[test]
    fn test_missing_series() {
        let body = json!({ "Meta Data": {} });
        match parse_time_series("SOXL", &body, cutoff()) {
            Err(CalculatorError::MissingData { detail, .. }) => assert!(detail.contains("Meta Data")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_close() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-03-05": { "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "n/a" }
            }
        });
        assert!(matches!(
            parse_time_series("SOXL", &body, cutoff()),
            Err(CalculatorError::MissingData { .. })
        ));
    }

    #[test]
    fn test_window_can_be_empty() {
        let late_cutoff = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let history = parse_time_series("SOXL", &sample_body(), late_cutoff).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.day_high, 42.5);
    }

    #[test]
    fn test_preview_is_bounded() {
        let body = json!({ "blob": "x".repeat(1000) });
        assert!(preview(&body).len() <= 203);
    }
}
