//! Top-level buy level calculation
//!
//! [`BuyLevelCalculator`] runs one fetch + compute cycle per request and keeps
//! the state a display layer needs between requests: the latest committed
//! result, the current error banner and whether a request is outstanding.
//!
//! Every request gets a monotonic generation number. A completion whose
//! generation is no longer the newest is discarded, so a slow response can
//! never overwrite the result of a request issued after it.

use crate::config::AppConfig;
use crate::errors::{CalculatorError, Locale, Result};
use crate::format::FormattedResult;
use crate::source::{build_source, PriceHistorySource};
use crate::statistics::StatisticalEngine;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// What happened to a completed request
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationOutcome {
    /// Result became the latest displayed result
    Committed(FormattedResult),
    /// A newer request was issued while this one was in flight; its result
    /// or failure was dropped
    Superseded { generation: u64 },
}

impl CalculationOutcome {
    pub fn committed(&self) -> Option<&FormattedResult> {
        match self {
            CalculationOutcome::Committed(result) => Some(result),
            CalculationOutcome::Superseded { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct DisplayState {
    latest: Option<FormattedResult>,
    error: Option<String>,
}

/// Holds the in-flight count for the lifetime of one request
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }

    /// Enter only when nothing else is outstanding
    fn try_enter(counter: &'a AtomicUsize) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(counter))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct BuyLevelCalculator {
    source: Arc<dyn PriceHistorySource>,
    engine: StatisticalEngine,
    locale: Locale,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    state: Mutex<DisplayState>,
}

impl BuyLevelCalculator {
    pub fn new(source: Arc<dyn PriceHistorySource>, engine: StatisticalEngine) -> Self {
        Self {
            source,
            engine,
            locale: Locale::default(),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(DisplayState::default()),
        }
    }

    /// Build the source and engine described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = build_source(config)?;
        let engine = StatisticalEngine::with_config(config.engine_config())?;
        Ok(Self::new(source, engine).with_locale(config.locale))
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Calculate buy levels for `ticker`, superseding any outstanding request.
    ///
    /// Used for programmatic triggers such as picking a preset ticker.
    pub async fn calculate(&self, ticker: &str) -> Result<CalculationOutcome> {
        let symbol = self.normalize(ticker)?;
        let guard = InFlightGuard::enter(&self.in_flight);
        self.run(&symbol, guard).await
    }

    /// Calculate buy levels for `ticker` unless a request is already outstanding.
    ///
    /// Used for the explicit trigger, which is unavailable while loading.
    /// Returns [`CalculatorError::Busy`] without touching any state when a
    /// request is in flight.
    pub async fn try_calculate(&self, ticker: &str) -> Result<CalculationOutcome> {
        let symbol = self.normalize(ticker)?;
        let guard = InFlightGuard::try_enter(&self.in_flight).ok_or(CalculatorError::Busy)?;
        self.run(&symbol, guard).await
    }

    /// Whether any request is outstanding
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Latest committed result, kept across later failures
    pub fn latest(&self) -> Option<FormattedResult> {
        self.lock_state().latest.clone()
    }

    /// Current error banner, if the newest request failed
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    /// Generation number of the newest issued request
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn normalize(&self, ticker: &str) -> Result<String> {
        let symbol = ticker.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            let err = CalculatorError::EmptyInput;
            self.lock_state().error = Some(err.user_message(self.locale));
            return Err(err);
        }
        Ok(symbol)
    }

    async fn run(&self, symbol: &str, _guard: InFlightGuard<'_>) -> Result<CalculationOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock_state().error = None;
        debug!(symbol, generation, source = self.source.name(), "calculation started");

        let result = self.fetch_and_compute(symbol).await;

        let mut state = self.lock_state();
        if generation != self.generation.load(Ordering::SeqCst) {
            warn!(symbol, generation, "discarding superseded calculation");
            return Ok(CalculationOutcome::Superseded { generation });
        }

        match result {
            Ok(formatted) => {
                info!(
                    symbol,
                    generation,
                    current = %formatted.current_price,
                    buy = %formatted.buy_price,
                    days = formatted.additional_info.days_of_data,
                    "calculation committed"
                );
                state.latest = Some(formatted.clone());
                state.error = None;
                Ok(CalculationOutcome::Committed(formatted))
            }
            Err(err) => {
                warn!(symbol, generation, error = %err, "calculation failed");
                state.error = Some(err.user_message(self.locale));
                Err(err)
            }
        }
    }

    async fn fetch_and_compute(&self, symbol: &str) -> Result<FormattedResult> {
        let history = self.source.fetch_history(symbol).await?;
        let metrics = self.engine.compute_metrics(&history)?;
        Ok(FormattedResult::from_metrics(symbol, &metrics))
    }

    fn lock_state(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
