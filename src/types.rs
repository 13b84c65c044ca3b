//! Core data types shared by price sources, the statistics engine and the calculator

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLC record as delivered by a time-series provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading day
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Highest price of the day
    pub high: f64,
    /// Lowest price of the day
    pub low: f64,
    /// Closing price
    pub close: f64,
}

/// Price history for one ticker, normalized across providers
///
/// `closes` is ordered most-recent-first: `closes[0]` is the current price and
/// `closes[1]` the previous close. The value is created fresh for every
/// calculation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Ticker symbol the history belongs to
    pub symbol: String,
    /// Daily closes, most recent first
    pub closes: Vec<f64>,
    /// Intraday high of the most recent trading day
    pub day_high: f64,
    /// Intraday low of the most recent trading day
    pub day_low: f64,
    /// Provider-supplied day change in percent; derived from closes when `None`
    pub day_change_pct: Option<f64>,
    /// Oldest date inside the window (time-series providers only)
    pub start_date: Option<NaiveDate>,
    /// Newest date inside the window (time-series providers only)
    pub end_date: Option<NaiveDate>,
}

impl PriceHistory {
    /// Build a history from bare closes (most recent first) and intraday extremes
    pub fn from_closes(symbol: impl Into<String>, closes: Vec<f64>, day_low: f64, day_high: f64) -> Self {
        Self {
            symbol: symbol.into(),
            closes,
            day_high,
            day_low,
            day_change_pct: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Build a windowed history from daily bars.
    ///
    /// Bars may arrive in any order. They are sorted newest first, every bar
    /// older than `cutoff` is dropped, and the intraday range is taken from the
    /// newest bar overall.
    pub fn from_daily_bars(symbol: impl Into<String>, mut bars: Vec<DailyBar>, cutoff: NaiveDate) -> Option<Self> {
        bars.sort_by(|a, b| b.date.cmp(&a.date));
        let newest = *bars.first()?;

        let window: Vec<&DailyBar> = bars.iter().filter(|bar| bar.date >= cutoff).collect();

        Some(Self {
            symbol: symbol.into(),
            closes: window.iter().map(|bar| bar.close).collect(),
            day_high: newest.high,
            day_low: newest.low,
            day_change_pct: None,
            start_date: window.last().map(|bar| bar.date),
            end_date: window.first().map(|bar| bar.date),
        })
    }

    /// Attach a provider-supplied day change percentage
    pub fn with_day_change_pct(mut self, pct: f64) -> Self {
        self.day_change_pct = Some(pct);
        self
    }

    /// Number of closes in the window
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
