//! Buy level calculator CLI
//!
//! Usage: buylevel [TICKER] [--preset NAME] [--provider alpha-vantage|finnhub|csv] [--json]

use anyhow::{bail, Context, Result};
use buylevel::{AppConfig, BuyLevelCalculator, FormattedResult, Locale, MovingAveragePolicy, ProviderKind};
use clap::{Parser, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "buylevel", version, about = "Standard-deviation buy levels over two years of daily closes")]
struct Cli {
    /// Ticker symbol, e.g. SOXL
    ticker: Option<String>,

    /// Use one of the configured preset tickers
    #[arg(long, conflicts_with = "ticker")]
    preset: Option<String>,

    /// Price history provider (overrides config)
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// CSV file for the csv provider
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Config file (defaults to ./buylevel.toml when present)
    #[arg(long, short, env = "BUYLEVEL_CONFIG")]
    config: Option<PathBuf>,

    /// Fail instead of dividing a short moving average window by 20
    #[arg(long)]
    strict_ma: bool,

    #[arg(long, value_enum)]
    locale: Option<LocaleArg>,

    /// Log level for the buylevel crate (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,

    /// Print the configured presets and exit
    #[arg(long)]
    list_presets: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    AlphaVantage,
    Finnhub,
    Csv,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::AlphaVantage => ProviderKind::AlphaVantage,
            ProviderArg::Finnhub => ProviderKind::Finnhub,
            ProviderArg::Csv => ProviderKind::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocaleArg {
    En,
    Ko,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::En => Locale::En,
            LocaleArg::Ko => Locale::Ko,
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(format!("buylevel={}", level)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("buylevel=info")),
    };

    // Logs go to stderr so `--json` output stays parseable
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(provider) = cli.provider {
        config.provider = provider.into();
    }
    if let Some(path) = &cli.csv {
        config.csv_path = Some(path.clone());
        if cli.provider.is_none() {
            config.provider = ProviderKind::Csv;
        }
    }
    if cli.strict_ma {
        config.moving_average_policy = MovingAveragePolicy::Strict;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale.into();
    }
}

fn resolve_ticker(config: &AppConfig, cli: &Cli) -> Result<String> {
    match (&cli.ticker, &cli.preset) {
        (Some(ticker), _) => Ok(ticker.clone()),
        (None, Some(name)) => match config.preset(name) {
            Some(ticker) => Ok(ticker.to_string()),
            None => bail!("unknown preset {:?} (available: {})", name, config.presets.join(", ")),
        },
        // Empty input is reported by the calculator with a localized banner
        (None, None) => Ok(String::new()),
    }
}

fn render(result: &FormattedResult, locale: Locale) {
    let (labels, guide_title) = match locale {
        Locale::En => (
            ["Current price", "Buy price", "Deviation", "Change", "Day range", "MA20"],
            "Buy strategy guide",
        ),
        Locale::Ko => (
            ["현재가", "매수 가격", "표준편차", "등락률", "일중 범위", "20일 이동평균"],
            "매수 전략 가이드",
        ),
    };

    let change_color = if result.is_gain { Color::Green } else { Color::Red };

    let mut card = Table::new();
    card.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new(&result.ticker), Cell::new("")]);
    card.add_row(vec![Cell::new(labels[0]), Cell::new(format!("${}", result.current_price))]);
    card.add_row(vec![Cell::new(labels[1]), Cell::new(format!("${}", result.buy_price)).fg(Color::Cyan)]);
    card.add_row(vec![Cell::new(labels[2]), Cell::new(&result.deviation)]);
    card.add_row(vec![Cell::new(labels[3]), Cell::new(&result.price_change).fg(change_color)]);
    card.add_row(vec![Cell::new(labels[4]), Cell::new(format!("${}", result.day_range))]);
    card.add_row(vec![Cell::new(labels[5]), Cell::new(format!("${}", result.ma20))]);
    println!("{card}");

    let info = &result.additional_info;
    let mut details = Table::new();
    details.load_preset(UTF8_FULL);
    details.add_row(vec![Cell::new("Volatility"), Cell::new(&info.volatility)]);
    details.add_row(vec![Cell::new("Days of data"), Cell::new(info.days_of_data)]);
    details.add_row(vec![
        Cell::new("Period range"),
        Cell::new(format!("${} ~ ${}", info.period_low, info.period_high)),
    ]);
    if let Some(period) = result.period_label() {
        details.add_row(vec![Cell::new("Period"), Cell::new(period)]);
    }
    println!("{details}");

    println!("{}", guide_title);
    for line in result.strategy_guide(locale) {
        println!("  • {}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    if cli.list_presets {
        for preset in &config.presets {
            println!("{}", preset);
        }
        return Ok(());
    }

    let ticker = resolve_ticker(&config, &cli)?;
    let calculator = BuyLevelCalculator::from_config(&config).context("failed to set up calculator")?;
    let locale = calculator.locale();

    match calculator.try_calculate(&ticker).await {
        Ok(outcome) => {
            let Some(result) = outcome.committed() else {
                bail!("calculation was superseded");
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else {
                render(result, locale);
            }
            Ok(())
        }
        Err(err) => {
            let banner = calculator.last_error().unwrap_or_else(|| err.user_message(locale));
            eprintln!("{}", banner);
            std::process::exit(1);
        }
    }
}
