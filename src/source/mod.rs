//! Price history sources
//!
//! Every provider sits behind [`PriceHistorySource`] so the statistics engine
//! and the calculator never depend on a particular upstream API.
//!
//! - [`AlphaVantageSource`]: daily time series (full history, windowed locally)
//! - [`FinnhubSource`]: real-time quote plus pre-windowed daily candles
//! - [`CsvFileSource`]: local `date,open,high,low,close` file, no network

pub mod alpha_vantage;
pub mod csv_file;
pub mod finnhub;

pub use alpha_vantage::AlphaVantageSource;
pub use csv_file::CsvFileSource;
pub use finnhub::FinnhubSource;

use crate::config::{AppConfig, ProviderKind};
use crate::errors::{CalculatorError, Result};
use crate::types::PriceHistory;
use chrono::{Months, NaiveDate};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Capability to fetch the price history of one ticker
pub trait PriceHistorySource: Send + Sync {
    /// Short provider name used in logs and errors
    fn name(&self) -> &'static str;

    /// Fetch the windowed daily history for `symbol`, most recent close first
    fn fetch_history<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<PriceHistory>>;
}

/// Build the source selected by `config`
pub fn build_source(config: &AppConfig) -> Result<Arc<dyn PriceHistorySource>> {
    let source: Arc<dyn PriceHistorySource> = match config.provider {
        ProviderKind::AlphaVantage => {
            let key = required_key(config.alpha_vantage_key.as_deref(), "alpha_vantage_key")?;
            Arc::new(
                AlphaVantageSource::new(key)
                    .with_base_url(&config.alpha_vantage_url)
                    .with_lookback_years(config.lookback_years)
                    .with_timeout(config.request_timeout()),
            )
        }
        ProviderKind::Finnhub => {
            let key = required_key(config.finnhub_key.as_deref(), "finnhub_key")?;
            Arc::new(
                FinnhubSource::new(key)
                    .with_base_url(&config.finnhub_url)
                    .with_lookback_years(config.lookback_years)
                    .with_timeout(config.request_timeout()),
            )
        }
        ProviderKind::Csv => {
            let path = config.csv_path.as_ref().ok_or_else(|| CalculatorError::Config {
                message: "csv_path is required for the csv provider".to_string(),
            })?;
            Arc::new(CsvFileSource::new(path).with_lookback_years(config.lookback_years))
        }
    };
    Ok(source)
}

fn required_key<'a>(key: Option<&'a str>, name: &str) -> Result<&'a str> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(CalculatorError::Config {
            message: format!("{} is not set (config file or BUYLEVEL_{} env)", name, name.to_uppercase()),
        }),
    }
}

/// Oldest date kept in a window of `years` calendar years ending `today`
pub fn window_cutoff(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Run a request future under a timeout
pub(crate) async fn with_timeout<T>(timeout: Duration, request: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(CalculatorError::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_cutoff() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(window_cutoff(today, 2), NaiveDate::from_ymd_opt(2024, 10, 19).unwrap());

        // Feb 29 clamps to Feb 28
        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(window_cutoff(leap, 1), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn test_build_source_requires_key() {
        let config = AppConfig::default();
        match build_source(&config) {
            Err(CalculatorError::Config { message }) => assert!(message.contains("alpha_vantage_key")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing key error"),
        }
    }

    #[test]
    fn test_build_source_blank_key_rejected() {
        let config = AppConfig {
            provider: ProviderKind::Finnhub,
            finnhub_key: Some("   ".to_string()),
            ..AppConfig::default()
        };
        assert!(build_source(&config).is_err());
    }

    #[test]
    fn test_build_source_selects_provider() {
        let config = AppConfig {
            provider: ProviderKind::Finnhub,
            finnhub_key: Some("token".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(build_source(&config).unwrap().name(), "finnhub");

        let config = AppConfig {
            provider: ProviderKind::Csv,
            csv_path: Some("prices.csv".into()),
            ..AppConfig::default()
        };
        assert_eq!(build_source(&config).unwrap().name(), "csv");
    }
}
