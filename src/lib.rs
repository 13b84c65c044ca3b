//! # Buylevel
//!
//! Standard-deviation buy levels for a stock ticker, computed over two years of
//! daily closes.
//!
//! ## Quick Start
//!
//! ```rust
//! use buylevel::{FormattedResult, PriceHistory, StatisticalEngine};
//!
//! // Closes are ordered most recent first
//! let history = PriceHistory::from_closes("SOXL", vec![100.0, 102.0, 98.0, 101.0], 99.0, 101.5);
//!
//! let engine = StatisticalEngine::new();
//! let metrics = engine.compute_metrics(&history).unwrap();
//! let result = FormattedResult::from_metrics("SOXL", &metrics);
//!
//! assert_eq!(result.current_price, "100.00");
//! assert_eq!(result.buy_price, "98.29");
//! assert_eq!(result.deviation, "-1.00σ");
//! ```
//!
//! ## Method
//!
//! Over the window of daily closes `P` (`P[0]` is the current price):
//!
//! 1. **Mean** and **sample standard deviation** `σ` (denominator `N - 1`)
//! 2. **Buy price** `P[0] - σ`, with `P[0] - 2σ` as the lower scaling level
//! 3. **Moving average** of the most recent 20 closes, always divided by 20
//! 4. **Volatility** `σ / mean` as a percentage
//!
//! ## Sources
//!
//! - **Alpha Vantage** daily time series
//! - **Finnhub** quote + daily candles
//! - **CSV** file with `date,open,high,low,close` rows (offline)

pub mod calculator;
pub mod config;
pub mod errors;
pub mod format;
pub mod source;
pub mod statistics;
pub mod types;

// Re-export commonly used types for convenience
pub use calculator::{BuyLevelCalculator, CalculationOutcome};
pub use config::{AppConfig, ProviderKind};
pub use errors::{CalculatorError, Locale, Result};
pub use format::{AdditionalInfo, FormattedResult};
pub use source::{AlphaVantageSource, CsvFileSource, FinnhubSource, PriceHistorySource};
pub use statistics::{
    DerivedMetrics, EngineConfig, MovingAveragePolicy, StatisticalEngine, StatisticsError,
};
pub use types::{DailyBar, PriceHistory};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_statistics_export() {
        let engine = StatisticalEngine::new();
        assert_eq!(engine.config().moving_average_window, 20);
        assert_eq!(engine.config().moving_average_policy, MovingAveragePolicy::FixedDivisor);
    }
}
