//! Display formatting for derived metrics
//!
//! Every number is rendered with two decimals using Rust's `{:.2}`, which
//! rounds the exact binary value to the nearest representable string (exact
//! ties go to even). `100.005` is stored as `100.00499999...` and therefore
//! renders as `"100.00"`. A negative zero is printed as `"0.00"`.

use crate::errors::Locale;
use crate::statistics::DerivedMetrics;
use serde::{Deserialize, Serialize};

/// Sigma multiplier reported next to the buy price. The buy level is always
/// one standard deviation below the current price.
pub const BUY_SIGMA_LABEL: &str = "-1.00σ";

/// Render a number with two decimals
pub fn fixed2(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    if formatted == "-0.00" {
        "0.00".to_string()
    } else {
        formatted
    }
}

/// Render a percentage with two decimals and a `%` suffix
pub fn percent(value: f64) -> String {
    format!("{}%", fixed2(value))
}

/// Secondary statistics over the whole window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    pub volatility: String,
    pub days_of_data: usize,
    pub period_high: String,
    pub period_low: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// String-formatted result handed to the display layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedResult {
    pub ticker: String,
    pub current_price: String,
    pub buy_price: String,
    pub deviation: String,
    pub price_change: String,
    /// Day change direction, used to color `price_change`
    pub is_gain: bool,
    pub day_range: String,
    pub ma20: String,
    pub additional_info: AdditionalInfo,
}

impl FormattedResult {
    pub fn from_metrics(ticker: &str, metrics: &DerivedMetrics) -> Self {
        Self {
            ticker: ticker.to_string(),
            current_price: fixed2(metrics.current_price),
            buy_price: fixed2(metrics.minus_one_sigma),
            deviation: BUY_SIGMA_LABEL.to_string(),
            price_change: percent(metrics.price_change_pct),
            is_gain: metrics.price_change_pct >= 0.0,
            day_range: format!("{} - {}", fixed2(metrics.day_low), fixed2(metrics.day_high)),
            ma20: fixed2(metrics.moving_average),
            additional_info: AdditionalInfo {
                volatility: percent(metrics.volatility_pct),
                days_of_data: metrics.days_of_data,
                period_high: fixed2(metrics.period_high),
                period_low: fixed2(metrics.period_low),
                start_date: metrics.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
                end_date: metrics.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            },
        }
    }

    /// Buying guide lines shown under the result
    pub fn strategy_guide(&self, locale: Locale) -> Vec<String> {
        let info = &self.additional_info;
        match locale {
            Locale::En => vec![
                "Start buying at the current price".to_string(),
                "Scale in between -1σ and -2σ".to_string(),
                format!("Account for volatility of {}", info.volatility),
                format!("Two-year buying range: ${} ~ ${}", info.period_low, info.period_high),
            ],
            Locale::Ko => vec![
                "현재가 기준 매수 시작".to_string(),
                "-1σ ~ -2σ 구간에서 분할 매수".to_string(),
                format!("변동성 {} 고려", info.volatility),
                format!("2년 기준 매수 가능 범위: ${} ~ ${}", info.period_low, info.period_high),
            ],
        }
    }

    /// `start ~ end` when the source reported window dates
    pub fn period_label(&self) -> Option<String> {
        let info = &self.additional_info;
        match (&info.start_date, &info.end_date) {
            (Some(start), Some(end)) => Some(format!("{} ~ {}", start, end)),
            _ => None,
        }
    }
}
