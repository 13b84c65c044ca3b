//! Descriptive statistics over a daily close series
//!
//! The engine turns one [`PriceHistory`] into a [`DerivedMetrics`] value:
//! - Arithmetic mean and Bessel-corrected (N-1) sample standard deviation
//! - Moving average over the most recent `moving_average_window` closes
//! - Buy levels one and two standard deviations below the current price
//! - Period high/low and volatility (stddev as a percentage of the mean)
//!
//! Everything here is a pure function of its input. Calling the engine twice
//! on the same history yields bit-identical metrics.

use crate::types::PriceHistory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default moving average window (trading days)
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 20;

/// Minimum number of closes the engine accepts
pub const MIN_CLOSES: usize = 2;

/// Errors surfaced by the statistics engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatisticsError {
    #[error("Insufficient data: need at least 2 closes, got {available}")]
    InsufficientData { available: usize },

    #[error("Moving average window needs {required} closes, got {available}")]
    ShortMovingAverageWindow { required: usize, available: usize },

    #[error("Non-finite close at index {index}")]
    NonFinitePrice { index: usize },

    #[error("Invalid engine configuration: {message}")]
    InvalidConfig { message: String },
}

/// How the moving average behaves when fewer closes than the window exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAveragePolicy {
    /// Sum whatever closes exist and still divide by the full window
    #[default]
    FixedDivisor,
    /// Fail with [`StatisticsError::ShortMovingAverageWindow`]
    Strict,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub moving_average_window: usize,
    pub moving_average_policy: MovingAveragePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            moving_average_window: DEFAULT_MOVING_AVERAGE_WINDOW,
            moving_average_policy: MovingAveragePolicy::FixedDivisor,
        }
    }
}

/// Metrics derived from one price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub current_price: f64,
    pub previous_price: f64,
    pub mean: f64,
    /// Sample standard deviation (denominator N-1)
    pub std_dev: f64,
    /// Mean of the most recent `moving_average_window` closes
    pub moving_average: f64,
    pub minus_one_sigma: f64,
    pub minus_two_sigma: f64,
    pub price_change_pct: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub volatility_pct: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub days_of_data: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Statistics engine
#[derive(Debug, Clone, Default)]
pub struct StatisticalEngine {
    config: EngineConfig,
}

impl StatisticalEngine {
    /// Create an engine with the default 20-day window and fixed divisor
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, StatisticsError> {
        if config.moving_average_window == 0 {
            return Err(StatisticsError::InvalidConfig {
                message: "moving_average_window must be at least 1".to_string(),
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute every derived metric for `history`
    pub fn compute_metrics(&self, history: &PriceHistory) -> Result<DerivedMetrics, StatisticsError> {
        let closes = history.closes.as_slice();

        if closes.len() < MIN_CLOSES {
            return Err(StatisticsError::InsufficientData {
                available: closes.len(),
            });
        }
        if let Some(index) = closes.iter().position(|price| !price.is_finite()) {
            return Err(StatisticsError::NonFinitePrice { index });
        }

        let current_price = closes[0];
        let previous_price = closes[1];

        let mean = mean(closes);
        let std_dev = sample_std_dev(closes, mean);
        let moving_average = self.moving_average(closes)?;
        let (period_low, period_high) = min_max(closes);

        let price_change_pct = match history.day_change_pct {
            Some(pct) => pct,
            None => (current_price - previous_price) / previous_price * 100.0,
        };

        Ok(DerivedMetrics {
            current_price,
            previous_price,
            mean,
            std_dev,
            moving_average,
            minus_one_sigma: current_price - std_dev,
            minus_two_sigma: current_price - 2.0 * std_dev,
            price_change_pct,
            day_high: history.day_high,
            day_low: history.day_low,
            volatility_pct: std_dev / mean * 100.0,
            period_high,
            period_low,
            days_of_data: closes.len(),
            start_date: history.start_date,
            end_date: history.end_date,
        })
    }

    fn moving_average(&self, closes: &[f64]) -> Result<f64, StatisticsError> {
        let window = self.config.moving_average_window;
        if closes.len() < window && self.config.moving_average_policy == MovingAveragePolicy::Strict {
            return Err(StatisticsError::ShortMovingAverageWindow {
                required: window,
                available: closes.len(),
            });
        }

        let recent = &closes[..window.min(closes.len())];
        Ok(recent.iter().sum::<f64>() / window as f64)
    }
}

/// Arithmetic mean, `sum / len`
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation around a precomputed mean
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    let sum_squares = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>();
    (sum_squares / (values.len() - 1) as f64).sqrt()
}

/// Lowest and highest value; `(inf, -inf)` for an empty slice
pub fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &x| (low.min(x), high.max(x)))
}
