//! Calculator request lifecycle: generations, in-flight tracking, failure policy

use buylevel::{
    BuyLevelCalculator, CalculationOutcome, CalculatorError, Locale, PriceHistory, PriceHistorySource,
    StatisticalEngine,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Serves canned closes per symbol; symbols starting with `GATED` wait for the gate to open
struct FixtureSource {
    closes: HashMap<&'static str, Vec<f64>>,
    gate: Arc<Notify>,
    fetches: AtomicUsize,
}

const GATED: &str = "SLOW";

impl FixtureSource {
    fn new() -> Self {
        let mut closes = HashMap::new();
        closes.insert("SOXL", (0..20).map(|i| 105.0 - 5.0 * i as f64).collect());
        closes.insert("TQQQ", vec![60.0, 58.0, 59.0, 61.0]);
        closes.insert(GATED, vec![10.0, 11.0, 12.0]);
        closes.insert("ONE", vec![5.0]);
        Self {
            closes,
            gate: Arc::new(Notify::new()),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl PriceHistorySource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn fetch_history<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, buylevel::Result<PriceHistory>> {
        async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if symbol.starts_with(GATED) {
                self.gate.notified().await;
            }
            match self.closes.get(symbol) {
                Some(closes) => Ok(PriceHistory::from_closes(symbol, closes.clone(), 1.0, 2.0)),
                None => Err(CalculatorError::Upstream {
                    provider: "fixture",
                    message: Some(format!("Invalid API call for {symbol}")),
                }),
            }
        }
        .boxed()
    }
}

fn setup() -> (BuyLevelCalculator, Arc<FixtureSource>) {
    let source = Arc::new(FixtureSource::new());
    let calculator = BuyLevelCalculator::new(source.clone(), StatisticalEngine::new());
    (calculator, source)
}

#[tokio::test]
async fn test_commit_sets_latest() {
    let (calc, _) = setup();

    let outcome = calc.calculate("soxl").await.unwrap();
    let result = outcome.committed().unwrap();

    assert_eq!(result.ticker, "SOXL");
    assert_eq!(result.buy_price, "75.42");
    assert_eq!(calc.latest().as_ref(), Some(result));
    assert_eq!(calc.last_error(), None);
    assert_eq!(calc.current_generation(), 1);
    assert!(!calc.is_loading());
}

#[tokio::test]
async fn test_empty_input_skips_fetch() {
    let (calc, source) = setup();

    assert!(matches!(calc.try_calculate("").await, Err(CalculatorError::EmptyInput)));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(calc.current_generation(), 0);
    assert_eq!(calc.last_error().as_deref(), Some("Please enter a ticker."));
}

#[tokio::test]
async fn test_late_completion_is_discarded() {
    let (calc, source) = setup();

    let (slow, fast) = tokio::join!(calc.calculate(GATED), async {
        let outcome = calc.calculate("TQQQ").await;
        source.gate.notify_one();
        outcome
    });

    assert_eq!(slow.unwrap(), CalculationOutcome::Superseded { generation: 1 });
    assert_eq!(fast.unwrap().committed().map(|r| r.ticker.as_str()), Some("TQQQ"));
    assert_eq!(calc.latest().unwrap().ticker, "TQQQ");
    assert_eq!(calc.current_generation(), 2);
    assert!(!calc.is_loading());
}

#[tokio::test]
async fn test_late_failure_does_not_set_banner() {
    let (calc, source) = setup();
    let gate = source.gate.clone();

    // The gated request fails only after a newer one has committed
    let (slow, fast) = tokio::join!(calc.calculate("SLOWBAD"), async {
        let outcome = calc.calculate("SOXL").await;
        gate.notify_one();
        outcome
    });

    assert!(matches!(slow, Ok(CalculationOutcome::Superseded { .. })));
    assert!(fast.is_ok());
    assert_eq!(calc.last_error(), None);
}

#[tokio::test]
async fn test_try_calculate_busy_while_in_flight() {
    let (calc, source) = setup();

    let (slow, busy) = tokio::join!(calc.calculate(GATED), async {
        assert!(calc.is_loading());
        let outcome = calc.try_calculate("TQQQ").await;
        source.gate.notify_one();
        outcome
    });

    assert!(matches!(busy, Err(CalculatorError::Busy)));
    // Busy does not issue a generation, so the gated request still commits
    assert_eq!(slow.unwrap().committed().unwrap().ticker, GATED);
    assert_eq!(calc.current_generation(), 1);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert!(!calc.is_loading());
}

#[tokio::test]
async fn test_failure_keeps_previous_result() {
    let (calc, _) = setup();

    calc.calculate("SOXL").await.unwrap();
    let err = calc.calculate("NOPE").await.unwrap_err();

    assert!(err.is_upstream());
    assert_eq!(calc.latest().unwrap().ticker, "SOXL");
    assert_eq!(calc.last_error().as_deref(), Some("Invalid API call for NOPE"));
    assert!(!calc.is_loading());
}

#[tokio::test]
async fn test_success_clears_banner() {
    let (calc, _) = setup();

    calc.calculate("ONE").await.unwrap_err();
    assert!(calc.last_error().unwrap().contains("got 1 closes"));

    calc.calculate("TQQQ").await.unwrap();
    assert_eq!(calc.last_error(), None);
}

#[tokio::test]
async fn test_localized_insufficient_data_banner() {
    let source = Arc::new(FixtureSource::new());
    let calc = BuyLevelCalculator::new(source, StatisticalEngine::new()).with_locale(Locale::Ko);

    calc.calculate("ONE").await.unwrap_err();
    assert_eq!(
        calc.last_error().as_deref(),
        Some("가격 데이터가 부족합니다 (1일, 최소 2일 필요).")
    );
}
