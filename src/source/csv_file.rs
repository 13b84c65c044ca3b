//! Local CSV price history source
//!
//! Expected header: `date,open,high,low,close` with ISO dates. An optional
//! `symbol` column lets one file hold several tickers; rows for other symbols
//! are skipped. The window is anchored on the newest date in the file rather
//! than today, so archived files keep producing the same result.

use super::{window_cutoff, PriceHistorySource};
use crate::errors::{CalculatorError, Result};
use crate::types::{DailyBar, PriceHistory};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const PROVIDER: &str = "csv";

/// CSV row format
#[derive(Debug, Clone, Deserialize)]
pub struct CsvDailyBar {
    #[serde(default)]
    pub symbol: Option<String>,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<CsvDailyBar> for DailyBar {
    fn from(row: CsvDailyBar) -> Self {
        Self {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    lookback_years: u32,
}

impl CsvFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lookback_years: 2,
        }
    }

    pub fn with_lookback_years(mut self, years: u32) -> Self {
        self.lookback_years = years;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PriceHistorySource for CsvFileSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn fetch_history<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<PriceHistory>> {
        async move {
            debug!(provider = PROVIDER, symbol, path = %self.path.display(), "reading price file");
            let content = tokio::fs::read(&self.path).await?;
            parse_csv(symbol, &content, self.lookback_years)
        }
        .boxed()
    }
}

/// Parse CSV bytes into a history windowed on the newest row
pub fn parse_csv(symbol: &str, content: &[u8], lookback_years: u32) -> Result<PriceHistory> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let mut bars = Vec::new();
    for result in reader.deserialize() {
        let row: CsvDailyBar = result?;
        let matches = row
            .symbol
            .as_deref()
            .is_none_or(|row_symbol| row_symbol.eq_ignore_ascii_case(symbol));
        if matches {
            bars.push(DailyBar::from(row));
        }
    }

    let newest = bars
        .iter()
        .map(|bar| bar.date)
        .max()
        .ok_or_else(|| CalculatorError::MissingData {
            provider: PROVIDER,
            detail: format!("no rows for {}", symbol),
        })?;

    let cutoff = window_cutoff(newest, lookback_years);
    PriceHistory::from_daily_bars(symbol, bars, cutoff).ok_or_else(|| CalculatorError::MissingData {
        provider: PROVIDER,
        detail: format!("no rows for {}", symbol),
    })
}
