//! CLI Command Handlers
//!
//! Implementation of the `analyze`, `backtest` and `stats` commands.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::adapters::market_data::{CachedMarketData, JsonFileMarketData};
use crate::analytics::{
    BacktestConfig, BacktestReport, DistributionStats, StatisticalAnalyzer, StatisticalMetrics,
    WalkForwardReport, DEFAULT_WALK_FORWARD_STEP, DEFAULT_WALK_FORWARD_WINDOW,
};
use crate::application::{
    AnalysisMode, ScannerService, ScannerSettings, TimeframeSignal, TokenReport,
};
use crate::config::{load_config_or_default, Config};
use crate::domain::{simple_returns, PriceSeries, TokenAddress};
use crate::ports::{CandleInterval, MarketDataPort};
use crate::strategy::{BuyAndHoldStrategy, MacdCrossoverStrategy, MarketRegime, Strategy};

/// MACD scanner - indicators, risk statistics and backtests for Solana tokens
#[derive(Parser, Debug)]
#[command(
    name = "macd-scanner",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "MACD / risk-statistics scanner for Solana tokens",
    long_about = "Computes MACD, Sharpe/Sortino, VaR, Kelly sizing and market regime \
                  for a token's historical candles, and backtests MACD strategies over them."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file (defaults apply when missing)
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one token: MACD, statistics, regime, divergence
    Analyze(AnalyzeCmd),

    /// Backtest a strategy over a token's candles
    Backtest(BacktestCmd),

    /// Risk statistics for a local price file
    Stats(StatsCmd),
}

/// Analyze a token
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// Token mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Candle interval (1m, 5m, 15m, 1h, 4h, 1d)
    #[arg(short, long, value_name = "INTERVAL")]
    pub interval: Option<CandleInterval>,

    /// Number of candles to analyze
    #[arg(short, long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Use volatility-adaptive MACD periods
    #[arg(long)]
    pub adaptive: bool,

    /// Also report MACD bias on every interval
    #[arg(long)]
    pub timeframes: bool,

    /// Override candle directory
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Strategy driven through the backtest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StrategyKind {
    /// Buy on bullish MACD crossover, sell on bearish
    #[default]
    MacdCrossover,
    /// Buy once and hold to the end
    BuyAndHold,
}

/// Run backtesting
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// Token mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Candle interval (1m, 5m, 15m, 1h, 4h, 1d)
    #[arg(short, long, value_name = "INTERVAL")]
    pub interval: Option<CandleInterval>,

    /// Number of candles to simulate over
    #[arg(short, long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Strategy to simulate
    #[arg(short, long, value_enum, default_value_t = StrategyKind::MacdCrossover)]
    pub strategy: StrategyKind,

    /// Minimum histogram strength for crossover entries
    #[arg(long, value_name = "STRENGTH", default_value = "0")]
    pub min_strength: f64,

    /// Starting capital for backtest
    #[arg(long, value_name = "AMOUNT")]
    pub capital: Option<f64>,

    /// Fraction of capital per entry (0-1]
    #[arg(long, value_name = "FRACTION")]
    pub position_size: Option<f64>,

    /// Stop loss as a fraction of entry price
    #[arg(long, value_name = "FRACTION")]
    pub stop_loss: Option<f64>,

    /// Take profit as a fraction of entry price
    #[arg(long, value_name = "FRACTION")]
    pub take_profit: Option<f64>,

    /// Allow short positions
    #[arg(long)]
    pub allow_short: bool,

    /// Run rolling walk-forward analysis instead of a single pass
    #[arg(long)]
    pub walk_forward: bool,

    /// Walk-forward in-sample window (candles)
    #[arg(long, value_name = "CANDLES", default_value_t = DEFAULT_WALK_FORWARD_WINDOW)]
    pub window: usize,

    /// Walk-forward step (candles)
    #[arg(long, value_name = "CANDLES", default_value_t = DEFAULT_WALK_FORWARD_STEP)]
    pub step: usize,

    /// Output detailed trade log
    #[arg(short = 't', long)]
    pub trades: bool,

    /// Override candle directory
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Statistics over a local file
#[derive(Parser, Debug)]
pub struct StatsCmd {
    /// JSON file: array of candles or array of closes
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Peer price files for the correlation matrix
    #[arg(long = "peer", value_name = "FILE")]
    pub peers: Vec<PathBuf>,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = load_config_or_default(&app.config)
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;

    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Analyze(cmd) => analyze_command(cmd, &config, app.json).await,
        Command::Backtest(cmd) => backtest_command(cmd, &config, app.json).await,
        Command::Stats(cmd) => stats_command(cmd, &config, app.json),
    }
}

/// Initialize logging system. `RUST_LOG` wins over flags, flags over config.
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn market_data(config: &Config, data_dir: Option<PathBuf>) -> CachedMarketData<JsonFileMarketData> {
    let dir = data_dir.unwrap_or_else(|| config.data.candles_path());
    CachedMarketData::with_ttls(
        JsonFileMarketData::new(dir),
        config.cache.price_ttl(),
        config.cache.candle_ttl(),
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle analyze command
async fn analyze_command(cmd: AnalyzeCmd, config: &Config, json: bool) -> Result<()> {
    let token = TokenAddress::parse(&cmd.token).context("Invalid token address")?;
    let interval = cmd.interval.unwrap_or(config.data.interval);
    let limit = cmd.limit.unwrap_or(config.data.limit);

    let mut service = ScannerService::new(ScannerSettings::from(config))?;
    if cmd.adaptive {
        service = service.with_mode(AnalysisMode::Adaptive);
    }

    let port = market_data(config, cmd.data_dir);
    let report = service
        .analyze_token(&port, &token, interval, limit)
        .await
        .with_context(|| format!("Analysis of {} failed", token))?;

    let timeframes = if cmd.timeframes {
        service.scan_timeframes(&port, &token).await
    } else {
        Vec::new()
    };

    if json {
        #[derive(Serialize)]
        struct Output {
            report: TokenReport,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            timeframes: Vec<TimeframeSignal>,
        }
        return print_json(&Output { report, timeframes });
    }

    print_report(&report);
    if !timeframes.is_empty() {
        println!("\nTimeframes:");
        for tf in &timeframes {
            println!(
                "  {:>4}  {:?} strength {:>6.2}  histogram {:+.6}",
                tf.interval.as_str(),
                tf.signal,
                tf.strength,
                tf.histogram
            );
        }
    }
    Ok(())
}

fn print_report(report: &TokenReport) {
    let m = &report.indicators;
    let s = &report.statistics;

    println!("Token:    {}", report.token);
    println!("Interval: {} ({} candles, {:?} mode)", report.interval, report.candles, report.mode);
    println!("Price:    {:.8}", report.current_price);
    println!();
    println!("MACD:      {:+.6}", m.macd);
    println!("Signal:    {:+.6}", m.signal);
    println!("Histogram: {:+.6}", m.histogram);
    println!("Bias:      {:?} (strength {:.2})", report.signal, report.signal_strength);
    println!();
    print_statistics(s);
    println!();
    print_regime(&report.regime);
    if !report.divergence.is_none() {
        println!(
            "Divergence: {:?} (strength {:.2}, price {:+.2}%, MACD {:+.2}%)",
            report.divergence.kind,
            report.divergence.strength,
            report.divergence.price_change,
            report.divergence.macd_change
        );
    }
    println!(
        "Volume 24h: {:.2} ({:+.2}%, {} trades)",
        report.volume.volume_24h, report.volume.volume_change, report.volume.trades_24h
    );
    for alert in &report.alerts {
        println!("ALERT: {:?}", alert);
    }
}

fn print_statistics(s: &StatisticalMetrics) {
    println!("Sharpe:       {:.4}", s.sharpe_ratio);
    println!("Sortino:      {:.4}", s.sortino_ratio);
    println!("VaR:          {:.4}%", s.value_at_risk);
    println!("Max drawdown: {:.2}%", s.max_drawdown);
    println!("Kelly:        {:.2}%", s.kelly_criterion);
    println!("Z-score:      {:+.4}", s.z_score);
}

fn print_regime(regime: &MarketRegime) {
    println!(
        "Regime: {} (confidence {:.1}%, trend {:+.2}%, volatility {:.2}%)",
        regime.regime, regime.confidence, regime.trend, regime.volatility
    );
}

/// Handle backtest command
async fn backtest_command(cmd: BacktestCmd, config: &Config, json: bool) -> Result<()> {
    let token = TokenAddress::parse(&cmd.token).context("Invalid token address")?;
    let interval = cmd.interval.unwrap_or(config.data.interval);
    let limit = cmd.limit.unwrap_or(config.data.limit);

    let backtest = backtest_config(&cmd, config);
    let service = ScannerService::new(ScannerSettings::from(config))?;

    let port = market_data(config, cmd.data_dir.clone());
    let series = port
        .fetch_candles(&token, interval, limit)
        .await
        .context("Failed to load candles")?;
    if series.is_empty() {
        bail!("No price data available for {}", token);
    }

    tracing::info!(
        token = %token.short(),
        candles = series.len(),
        strategy = ?cmd.strategy,
        "Starting backtest"
    );

    let mut strategy: Box<dyn Strategy> = match cmd.strategy {
        StrategyKind::MacdCrossover => {
            Box::new(MacdCrossoverStrategy::new().with_min_strength(cmd.min_strength))
        }
        StrategyKind::BuyAndHold => Box::new(BuyAndHoldStrategy),
    };

    if cmd.walk_forward {
        let report = service.walk_forward(
            series.candles(),
            strategy.as_mut(),
            backtest,
            cmd.window,
            cmd.step,
        )?;
        if json {
            return print_json(&report);
        }
        print_walk_forward(&report);
        return Ok(());
    }

    let report = service.run_backtest_with(series.candles(), strategy.as_mut(), backtest)?;
    if json {
        return print_json(&report);
    }
    print_backtest(&report, &backtest, cmd.trades);
    Ok(())
}

fn backtest_config(cmd: &BacktestCmd, config: &Config) -> BacktestConfig {
    let mut backtest = BacktestConfig::from(config);
    if let Some(capital) = cmd.capital {
        backtest = backtest.with_capital(capital);
    }
    if let Some(size) = cmd.position_size {
        backtest = backtest.with_position_size(size);
    }
    if cmd.stop_loss.is_some() {
        backtest = backtest.with_stop_loss(cmd.stop_loss);
    }
    if cmd.take_profit.is_some() {
        backtest = backtest.with_take_profit(cmd.take_profit);
    }
    if cmd.allow_short {
        backtest = backtest.with_shorting(true);
    }
    backtest
}

fn print_backtest(report: &BacktestReport, config: &BacktestConfig, show_trades: bool) {
    let m = &report.metrics;

    println!("Backtest Results:");
    println!("  Starting Capital: ${:.2}", config.initial_capital);
    println!("  Final Equity:     ${:.2}", report.final_equity());
    println!("  Total Return:     {:+.2}%", m.total_return);
    println!("  Annualized:       {:+.2}%", m.annualized_return);
    println!("  Max Drawdown:     {:.2}%", m.max_drawdown);
    println!("  Sharpe / Sortino: {:.3} / {:.3}", m.sharpe_ratio, m.sortino_ratio);
    println!("  VaR 95 / 99:      {:.3}% / {:.3}%", m.var_95, m.var_99);
    println!("  CVaR 95:          {:.3}%", m.cvar_95);
    println!("  Trades:           {} (win rate {:.1}%)", m.closed_trades, m.win_rate);
    println!("  Profit Factor:    {:.3}", m.profit_factor);
    println!("  Kelly:            {:.2}%", m.kelly_criterion);

    if show_trades {
        println!("\nTrades:");
        for trade in &report.trades {
            println!(
                "  {} {:?} {:.6} -> {} pnl {} ({:?})",
                format_timestamp(trade.entry_time),
                trade.position,
                trade.entry_price,
                trade
                    .exit_price
                    .map(|p| format!("{:.6}", p))
                    .unwrap_or_else(|| "-".to_string()),
                trade
                    .pnl
                    .map(|p| format!("{:+.2}", p))
                    .unwrap_or_else(|| "-".to_string()),
                trade.exit_reason,
            );
        }
    }
}

fn print_walk_forward(report: &WalkForwardReport) {
    println!("Walk-forward: {} windows", report.windows());
    println!("  {:>3}  {:>10}  {:>10}  {:>8}", "#", "in-sample", "out-sample", "trades");
    for (i, (is, oos)) in report.in_sample.iter().zip(&report.out_of_sample).enumerate() {
        println!(
            "  {:>3}  {:>+9.2}%  {:>+9.2}%  {:>8}",
            i + 1,
            is.total_return,
            oos.total_return,
            is.closed_trades + oos.closed_trades
        );
    }
}

/// Handle stats command
fn stats_command(cmd: StatsCmd, config: &Config, json: bool) -> Result<()> {
    let prices = read_prices(&cmd.file)?;
    if prices.len() < 2 {
        bail!("{} holds fewer than two prices", cmd.file.display());
    }
    let returns = simple_returns(&prices);

    let peers = cmd
        .peers
        .iter()
        .map(|path| read_prices(path).map(|p| simple_returns(&p)))
        .collect::<Result<Vec<_>>>()?;

    let analyzer = StatisticalAnalyzer::new(config.statistics);
    let statistics = analyzer
        .calculate_all_metrics(&prices, &returns, &peers)
        .context("Peer series must have the same length as the main series")?;
    let distribution = DistributionStats::from_data(&returns);
    let service = ScannerService::new(ScannerSettings::from(config))?;
    let regime = service.compute_regime(&prices, None);

    if json {
        #[derive(Serialize)]
        struct Output {
            statistics: StatisticalMetrics,
            distribution: DistributionStats,
            regime: MarketRegime,
        }
        return print_json(&Output {
            statistics,
            distribution,
            regime,
        });
    }

    println!("{} prices from {}", prices.len(), cmd.file.display());
    println!();
    print_statistics(&statistics);
    println!();
    println!("Return distribution:");
    println!("  Mean:     {:+.6}", distribution.mean);
    println!("  Median:   {:+.6}", distribution.median);
    println!("  Std dev:  {:.6}", distribution.std_dev);
    println!("  Skewness: {:+.4}", distribution.skewness);
    println!("  Kurtosis: {:+.4}", distribution.kurtosis);
    println!();
    print_regime(&regime);
    if statistics.correlation.len() > 1 {
        println!("\nCorrelation matrix:");
        for row in &statistics.correlation {
            let cells: Vec<String> = row.iter().map(|c| format!("{:+.3}", c)).collect();
            println!("  {}", cells.join("  "));
        }
    }
    Ok(())
}

/// Closes from a JSON file holding either candles or bare numbers
pub fn read_prices(path: &Path) -> Result<Vec<f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if let Ok(series) = serde_json::from_str::<PriceSeries>(&content) {
        return Ok(series.closes());
    }
    serde_json::from_str::<Vec<f64>>(&content)
        .with_context(|| format!("{} is neither a candle array nor a number array", path.display()))
}

fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}
