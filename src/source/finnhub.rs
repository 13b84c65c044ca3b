//! Finnhub quote + daily candle source
//!
//! Two requests per lookup: `/quote` for the live price, intraday range and
//! day change, and `/stock/candle` for the daily closes inside the window.
//! Upstream rejections are surfaced as a generic retry message; the raw
//! upstream text only goes to the log.

use super::{window_cutoff, with_timeout, PriceHistorySource};
use crate::errors::{CalculatorError, Result};
use crate::types::PriceHistory;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "finnhub";

/// Real-time quote fields used by the calculator
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FinnhubQuote {
    /// Current price
    #[serde(rename = "c")]
    pub current: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    /// Day change in percent
    #[serde(rename = "dp")]
    pub change_pct: Option<f64>,
    /// Quote time, unix seconds
    #[serde(rename = "t", default)]
    pub timestamp: i64,
}

/// Daily candles, oldest first
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FinnhubCandles {
    #[serde(rename = "s")]
    pub status: String,
    #[serde(rename = "c", default)]
    pub closes: Vec<f64>,
    #[serde(rename = "t", default)]
    pub timestamps: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct FinnhubSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
    lookback_years: u32,
    timeout: Duration,
}

impl FinnhubSource {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: crate::config::DEFAULT_FINNHUB_URL.to_string(),
            token: token.to_string(),
            lookback_years: 2,
            timeout: Duration::from_secs(30),
        }
    }

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

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if let Some(message) = body.get("error").and_then(Value::as_str) {
            warn!(provider = PROVIDER, path, %status, message, "upstream rejected request");
            return Err(CalculatorError::Upstream {
                provider: PROVIDER,
                message: None,
            });
        }
        if !status.is_success() {
            warn!(provider = PROVIDER, path, %status, "upstream returned error status");
            return Err(CalculatorError::Upstream {
                provider: PROVIDER,
                message: None,
            });
        }
        Ok(body)
    }

    async fn request(&self, symbol: &str) -> Result<(FinnhubQuote, FinnhubCandles)> {
        let now = Utc::now();
        let from = window_cutoff(now.date_naive(), self.lookback_years)
            .and_hms_opt(0, 0, 0)
            .map(|start| start.and_utc().timestamp())
            .unwrap_or(0);

        debug!(provider = PROVIDER, symbol, from, "requesting quote and daily candles");

        let quote_query = [("symbol", symbol.to_string())];
        let candle_query = [
            ("symbol", symbol.to_string()),
            ("resolution", "D".to_string()),
            ("from", from.to_string()),
            ("to", now.timestamp().to_string()),
        ];

        let (quote, candles) = futures::try_join!(
            self.get_json("/quote", &quote_query),
            self.get_json("/stock/candle", &candle_query),
        )?;

        Ok((serde_json::from_value(quote)?, serde_json::from_value(candles)?))
    }
}

impl PriceHistorySource for FinnhubSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn fetch_history<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<PriceHistory>> {
        async move {
            let (quote, candles) = with_timeout(self.timeout, self.request(symbol)).await?;
            assemble_history(symbol, &quote, &candles)
        }
        .boxed()
    }
}

/// Merge a quote and daily candles into one most-recent-first history.
///
/// The quote's current price becomes `closes[0]`: it replaces the candle of
/// the same UTC day, or is prepended when the newest candle is older.
pub fn assemble_history(symbol: &str, quote: &FinnhubQuote, candles: &FinnhubCandles) -> Result<PriceHistory> {
    if quote.current == 0.0 {
        return Err(CalculatorError::MissingData {
            provider: PROVIDER,
            detail: format!("no current quote for {}", symbol),
        });
    }
    if candles.status != "ok" {
        warn!(provider = PROVIDER, symbol, status = %candles.status, "candle request returned no data");
        return Err(CalculatorError::Upstream {
            provider: PROVIDER,
            message: None,
        });
    }
    if candles.closes.len() != candles.timestamps.len() {
        return Err(CalculatorError::MissingData {
            provider: PROVIDER,
            detail: format!(
                "candle arrays disagree: {} closes, {} timestamps",
                candles.closes.len(),
                candles.timestamps.len()
            ),
        });
    }

    let mut closes: Vec<f64> = candles.closes.iter().rev().copied().collect();
    let newest_candle_day = candles.timestamps.last().and_then(|&ts| utc_day(ts));

    match (newest_candle_day, utc_day(quote.timestamp)) {
        (Some(candle_day), Some(quote_day)) if candle_day == quote_day => closes[0] = quote.current,
        _ => closes.insert(0, quote.current),
    }

    let mut history = PriceHistory::from_closes(symbol, closes, quote.low, quote.high);
    history.day_change_pct = quote.change_pct;

    debug!(provider = PROVIDER, symbol, closes = history.len(), "assembled quote and candles");
    Ok(history)
}

fn utc_day(timestamp: i64) -> Option<NaiveDate> {
    if timestamp <= 0 {
        return None;
    }
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}
