//! Error types for price lookups and buy level calculation

use crate::statistics::StatisticsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calculator operations
pub type Result<T> = std::result::Result<T, CalculatorError>;

/// Language used for user-facing messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

/// Errors that can occur while fetching prices or computing buy levels
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("No ticker provided")]
    EmptyInput,

    #[error("A calculation is already in progress")]
    Busy,

    /// Explicit error or rate limit reported by the data provider.
    /// `message` is `None` when only a generic retry hint should be shown.
    #[error("Upstream error from {provider}: {}", .message.as_deref().unwrap_or("request rejected"))]
    Upstream {
        provider: &'static str,
        message: Option<String>,
    },

    #[error("Missing data from {provider}: {detail}")]
    MissingData {
        provider: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("File I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<::config::ConfigError> for CalculatorError {
    fn from(err: ::config::ConfigError) -> Self {
        CalculatorError::Config {
            message: err.to_string(),
        }
    }
}

impl CalculatorError {
    /// Short banner text shown to the user
    pub fn user_message(&self, locale: Locale) -> String {
        match (self, locale) {
            (CalculatorError::EmptyInput, Locale::En) => "Please enter a ticker.".to_string(),
            (CalculatorError::EmptyInput, Locale::Ko) => "티커를 입력해주세요.".to_string(),

            (CalculatorError::Busy, Locale::En) => "Still calculating, please wait.".to_string(),
            (CalculatorError::Busy, Locale::Ko) => "계산 중입니다. 잠시만 기다려주세요.".to_string(),

            (CalculatorError::Upstream { message: Some(message), .. }, _) => message.clone(),

            (CalculatorError::MissingData { detail, .. }, Locale::En) => {
                format!("Data lookup failed: {}", detail)
            }
            (CalculatorError::MissingData { detail, .. }, Locale::Ko) => {
                format!("데이터 조회 실패: {}", detail)
            }

            (CalculatorError::Statistics(StatisticsError::InsufficientData { available }), Locale::En) => {
                format!("Not enough price history (got {} closes, need at least 2).", available)
            }
            (CalculatorError::Statistics(StatisticsError::InsufficientData { available }), Locale::Ko) => {
                format!("가격 데이터가 부족합니다 ({}일, 최소 2일 필요).", available)
            }

            (CalculatorError::Config { message }, _) => message.clone(),

            (_, Locale::En) => "Data lookup failed. Please try again shortly.".to_string(),
            (_, Locale::Ko) => "데이터 조회 실패. 잠시 후 다시 시도해주세요.".to_string(),
        }
    }

    /// Whether the failure came from the provider rather than local input
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CalculatorError::Upstream { .. }
                | CalculatorError::MissingData { .. }
                | CalculatorError::Timeout { .. }
                | CalculatorError::Http { .. }
                | CalculatorError::Json { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_upstream_message_is_surfaced() {
        let err = CalculatorError::Upstream {
            provider: "alpha_vantage",
            message: Some("Invalid API call.".to_string()),
        };
        assert_eq!(err.user_message(Locale::En), "Invalid API call.");
        assert_eq!(err.user_message(Locale::Ko), "Invalid API call.");
    }

    #[test]
    fn test_generic_upstream_message() {
        let err = CalculatorError::Upstream {
            provider: "finnhub",
            message: None,
        };
        assert_eq!(
            err.user_message(Locale::Ko),
            "데이터 조회 실패. 잠시 후 다시 시도해주세요."
        );
        assert!(err.is_upstream());
    }

    #[test]
    fn test_empty_input_message() {
        assert_eq!(CalculatorError::EmptyInput.user_message(Locale::En), "Please enter a ticker.");
        assert_eq!(CalculatorError::EmptyInput.user_message(Locale::Ko), "티커를 입력해주세요.");
        assert!(!CalculatorError::EmptyInput.is_upstream());
    }

    #[test]
    fn test_insufficient_data_message() {
        let err: CalculatorError = StatisticsError::InsufficientData { available: 1 }.into();
        assert!(err.user_message(Locale::En).contains("got 1 closes"));
    }

    #[test]
    fn test_display_includes_provider() {
        let err = CalculatorError::MissingData {
            provider: "alpha_vantage",
            detail: "no series".to_string(),
        };
        assert_eq!(err.to_string(), "Missing data from alpha_vantage: no series");
    }
}
