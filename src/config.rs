//! Layered application configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults (`AppConfig::default`)
//! 2. Optional TOML file
//! 3. `BUYLEVEL_*` environment variables (`BUYLEVEL_PRESETS` is comma separated)
//!
//! API keys are only ever read from these sources.

use crate::errors::{CalculatorError, Locale, Result};
use crate::statistics::{EngineConfig, MovingAveragePolicy, DEFAULT_MOVING_AVERAGE_WINDOW};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BUYLEVEL";

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "buylevel.toml";

pub const DEFAULT_ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_FINNHUB_URL: &str = "https://finnhub.io/api/v1";

/// Which price history source to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    AlphaVantage,
    Finnhub,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub alpha_vantage_key: Option<String>,
    pub alpha_vantage_url: String,
    pub finnhub_key: Option<String>,
    pub finnhub_url: String,
    pub csv_path: Option<PathBuf>,
    /// Calendar years of history kept in the window
    pub lookback_years: u32,
    pub moving_average_window: usize,
    pub moving_average_policy: MovingAveragePolicy,
    pub request_timeout_secs: u64,
    /// Quick-pick tickers
    pub presets: Vec<String>,
    pub locale: Locale,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::AlphaVantage,
            alpha_vantage_key: None,
            alpha_vantage_url: DEFAULT_ALPHA_VANTAGE_URL.to_string(),
            finnhub_key: None,
            finnhub_url: DEFAULT_FINNHUB_URL.to_string(),
            csv_path: None,
            lookback_years: 2,
            moving_average_window: DEFAULT_MOVING_AVERAGE_WINDOW,
            moving_average_policy: MovingAveragePolicy::FixedDivisor,
            request_timeout_secs: 30,
            presets: vec!["SOXL".to_string(), "TQQQ".to_string(), "UPRO".to_string()],
            locale: Locale::En,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// An explicit `path` must exist; without one, `buylevel.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        let environment = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("presets");

        let config: AppConfig = Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every calculation fail
    pub fn validate(&self) -> Result<()> {
        if self.lookback_years == 0 {
            return Err(CalculatorError::Config {
                message: "lookback_years must be at least 1".to_string(),
            });
        }
        if self.moving_average_window == 0 {
            return Err(CalculatorError::Config {
                message: "moving_average_window must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(CalculatorError::Config {
                message: "request_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            moving_average_window: self.moving_average_window,
            moving_average_policy: self.moving_average_policy,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve a preset by case-insensitive name
    pub fn preset(&self, name: &str) -> Option<&str> {
        self.presets
            .iter()
            .find(|preset| preset.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.provider, ProviderKind::AlphaVantage);
        assert_eq!(config.lookback_years, 2);
        assert_eq!(config.moving_average_window, 20);
        assert_eq!(config.presets, vec!["SOXL", "TQQQ", "UPRO"]);
        assert!(config.alpha_vantage_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_lookup() {
        let config = AppConfig::default();
        assert_eq!(config.preset("tqqq"), Some("TQQQ"));
        assert_eq!(config.preset(" soxl "), Some("SOXL"));
        assert_eq!(config.preset("SPY"), None);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = AppConfig {
            moving_average_window: 0,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(CalculatorError::Config { .. })));
    }

    #[test]
    fn test_engine_config_mapping() {
        let config = AppConfig {
            moving_average_policy: MovingAveragePolicy::Strict,
            moving_average_window: 10,
            ..AppConfig::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.moving_average_window, 10);
        assert_eq!(engine.moving_average_policy, MovingAveragePolicy::Strict);
    }
}
