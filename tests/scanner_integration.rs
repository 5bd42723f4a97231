//! Scanner Integration Tests
//!
//! End-to-end checks across the public API:
//! 1. Indicator invariants (EMA seed, MACD alignment, crossover)
//! 2. Risk statistics properties (Kelly bounds, VaR ordering, drawdown)
//! 3. Backtest lifecycle on a rising market
//! 4. Candle files -> cached port -> ScannerService report
//!
//! All tests are deterministic (no network) and use generated data.

use approx::assert_relative_eq;
use std::time::Duration;
use tempfile::TempDir;

use macd_scanner::adapters::{CachedMarketData, JsonFileMarketData, ManualClock};
use macd_scanner::analytics::{BacktestConfig, BacktestEngine, CorrelationAnalyzer, StatisticalAnalyzer};
use macd_scanner::application::{AnalysisMode, ScanError, ScannerService, SignalBias};
use macd_scanner::domain::{Candle, ExitReason, PriceSeries, TokenAddress, TradeAction, SOL_MINT};
use macd_scanner::ports::{CandleInterval, MarketDataPort};
use macd_scanner::strategy::{
    Crossover, EmaCalculator, EmaTrendDetector, FixedRandom, HmmRegimeDetector, MacdCalculator,
    MacdResult, Regime, RegimeDetector, RegimeParams,
};

// ============================================================================
// Test Fixtures
// ============================================================================

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Oscillating series with a mild upward drift
fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.25).sin() * 8.0 + i as f64 * 0.05)
        .collect()
}

/// Strictly increasing series, +2% per step
fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 50.0 * 1.02f64.powi(i as i32)).collect()
}

fn hourly_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new(i as i64 * HOUR_MS, c, c * 1.01, c * 0.99, c, 1_000.0))
        .collect()
}

fn sol() -> TokenAddress {
    TokenAddress::parse(SOL_MINT).unwrap()
}

// ============================================================================
// Indicators
// ============================================================================

mod indicators {
    use super::*;

    #[test]
    fn test_ema_seed_is_simple_average() {
        let data: Vec<f64> = (1..=12).map(f64::from).collect();
        assert_relative_eq!(EmaCalculator::calculate(&data, 12), 6.5, epsilon = 1e-12);
    }

    #[test]
    fn test_histogram_is_macd_minus_signal_everywhere() {
        let calculator = MacdCalculator::default();
        for len in [35, 60, 150] {
            let result = calculator.calculate(&wave(len));

            assert!(!result.is_empty(), "len {} should produce history", len);
            assert_eq!(result.macd_history.len(), result.signal_history.len());
            assert_eq!(result.macd_history.len(), result.histogram_history.len());

            for i in 0..result.histogram_history.len() {
                assert_relative_eq!(
                    result.histogram_history[i],
                    result.macd_history[i] - result.signal_history[i],
                    epsilon = 1e-9
                );
            }
            assert_relative_eq!(result.histogram, result.macd - result.signal, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_short_series_is_degenerate_not_error() {
        let result = MacdCalculator::default().calculate(&wave(20));
        assert!(result.is_empty());
        assert_eq!(result.macd, 0.0);
    }

    #[test]
    fn test_same_result_twice_is_no_crossover() {
        let result = MacdCalculator::default().calculate(&wave(80));
        assert_eq!(MacdCalculator::detect_crossover(&result, &result), Crossover::None);
    }

    #[test]
    fn test_regime_detectors_agree_on_strong_uptrend() {
        let prices = rising(80);

        let mut trend = EmaTrendDetector::with_random(RegimeParams::default(), FixedRandom(0.5));
        let mut hmm = HmmRegimeDetector::new();

        assert_eq!(trend.detect(&prices, None).regime, Regime::Bullish);
        assert_eq!(hmm.detect(&prices, None).regime, Regime::Bullish);
    }

    #[test]
    fn test_regime_confidence_is_bounded() {
        let mut detector = EmaTrendDetector::with_random(RegimeParams::default(), FixedRandom(1.0));
        for prices in [wave(120), rising(120), rising(120).into_iter().rev().collect()] {
            let regime = detector.detect(&prices, None);
            assert!((0.0..=100.0).contains(&regime.confidence));
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

mod statistics {
    use super::*;

    #[test]
    fn test_kelly_always_within_bounds() {
        for win_rate in [0.0, 0.1, 0.35, 0.5, 0.65, 0.9, 1.0] {
            for (avg_win, avg_loss) in [(1.0, 1.0), (3.0, 1.0), (0.2, 2.0), (10.0, 0.1)] {
                let kelly = StatisticalAnalyzer::kelly_criterion(win_rate, avg_win, avg_loss);
                assert!(
                    (0.0..=25.0).contains(&kelly),
                    "kelly {} for p={} w={} l={}",
                    kelly,
                    win_rate,
                    avg_win,
                    avg_loss
                );
            }
        }
    }

    #[test]
    fn test_var_grows_with_confidence() {
        let prices = wave(300);
        let returns = PriceSeries::from_closes(&prices).returns();

        let var_95 = StatisticalAnalyzer::value_at_risk(&returns, 0.95);
        let var_99 = StatisticalAnalyzer::value_at_risk(&returns, 0.99);
        assert!(var_99 >= var_95, "var99 {} < var95 {}", var_99, var_95);
    }

    #[test]
    fn test_drawdown_properties() {
        assert_eq!(StatisticalAnalyzer::max_drawdown(&rising(50)), 0.0);

        let falling = [100.0, 90.0, 75.0, 60.0];
        assert_relative_eq!(
            StatisticalAnalyzer::max_drawdown(&falling),
            (1.0 - 60.0 / 100.0) * 100.0,
            epsilon = 1e-9
        );

        assert_relative_eq!(
            StatisticalAnalyzer::max_drawdown(&[100.0, 90.0, 95.0, 80.0, 110.0]),
            20.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_variance_sharpe_is_zero() {
        let returns = [0.01, 0.01, 0.01, 0.01, 0.01];
        assert_eq!(StatisticalAnalyzer::sharpe_ratio(&returns, 0.02, 252.0), 0.0);
    }

    #[test]
    fn test_statistics_are_deterministic() {
        let prices = wave(200);
        let returns = PriceSeries::from_closes(&prices).returns();
        let analyzer = StatisticalAnalyzer::default();

        let first = analyzer.calculate_all_metrics(&prices, &returns, &[]).unwrap();
        let second = analyzer.calculate_all_metrics(&prices, &returns, &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mismatched_correlation_inputs_fail_fast() {
        assert!(CorrelationAnalyzer::pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_err());

        let prices = wave(50);
        let returns = PriceSeries::from_closes(&prices).returns();
        let peers = vec![vec![0.1; 10]];
        assert!(StatisticalAnalyzer::default()
            .calculate_all_metrics(&prices, &returns, &peers)
            .is_err());
    }
}

// ============================================================================
// Backtesting
// ============================================================================

mod backtesting {
    use super::*;

    #[test]
    fn test_buy_once_on_rising_market() {
        let candles = hourly_candles(&rising(60));
        let last = *candles.last().unwrap();
        let engine = BacktestEngine::new(BacktestConfig::frictionless(10_000.0, 1.0)).unwrap();

        let mut bought = false;
        let mut buy_once = |_: &MacdResult, _: f64| {
            if bought {
                TradeAction::Hold
            } else {
                bought = true;
                TradeAction::Buy
            }
        };

        let report = engine.run_backtest(&candles, &mut buy_once);

        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert!(!trade.is_open);
        assert_eq!(trade.exit_reason, Some(ExitReason::EndOfData));
        assert_eq!(trade.exit_price, Some(last.close));
        assert_eq!(trade.exit_time, Some(last.timestamp));
        assert!(trade.pnl.unwrap() > 0.0);

        assert_eq!(report.equity[0], 10_000.0);
        assert!(report.final_equity() > 10_000.0);
    }

    #[test]
    fn test_equity_has_one_point_per_processed_candle() {
        let candles = hourly_candles(&wave(120));
        let config = BacktestConfig::default();
        let engine = BacktestEngine::new(config).unwrap();

        let mut hold = |_: &MacdResult, _: f64| TradeAction::Hold;
        let report = engine.run_backtest(&candles, &mut hold);

        assert_eq!(report.equity.len(), 1 + candles.len() - config.warmup);
        assert!(report.trades.is_empty());
        assert!(report.equity.iter().all(|&e| e == config.initial_capital));
    }
}

// ============================================================================
// Data Pipeline
// ============================================================================

mod pipeline {
    use super::*;

    fn write_token_file(dir: &TempDir, closes: &[f64]) {
        let path = dir.path().join(format!("{}.json", SOL_MINT));
        std::fs::write(path, serde_json::to_string(&hourly_candles(closes)).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_analyze_token_from_candle_file() {
        let dir = TempDir::new().unwrap();
        write_token_file(&dir, &rising(150));

        let port = CachedMarketData::with_clock(
            JsonFileMarketData::new(dir.path()),
            Duration::from_secs(60),
            Duration::from_secs(300),
            ManualClock::new(),
        );
        let service = ScannerService::default();

        let report = service
            .analyze_token(&port, &sol(), CandleInterval::OneHour, 120)
            .await
            .unwrap();

        assert_eq!(report.candles, 120);
        assert_eq!(report.mode, AnalysisMode::Standard);
        assert_eq!(report.indicators.timestamp, 149 * HOUR_MS);
        assert_eq!(report.signal, SignalBias::Bullish);
        assert_eq!(report.regime.regime, Regime::Bullish);
        assert_relative_eq!(report.current_price, rising(150)[149], epsilon = 1e-9);
        assert!((0.0..=25.0).contains(&report.statistics.kelly_criterion));

        // a second analysis is served from the candle cache
        service
            .analyze_token(&port, &sol(), CandleInterval::OneHour, 120)
            .await
            .unwrap();
        let (_, candles) = port.stats().await;
        assert_eq!(candles.hits, 1);
        assert_eq!(candles.misses, 1);
    }

    #[tokio::test]
    async fn test_timeframes_from_minute_file_are_distinct() {
        let dir = TempDir::new().unwrap();
        let minutes: Vec<Candle> = wave(300)
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c * 1.01, c * 0.99, c, 1.0))
            .collect();
        let path = dir.path().join(format!("{}.json", SOL_MINT));
        std::fs::write(path, serde_json::to_string(&minutes).unwrap()).unwrap();

        let port = JsonFileMarketData::new(dir.path());
        let one_minute = port
            .fetch_candles(&sol(), CandleInterval::OneMinute, 100)
            .await
            .unwrap();
        let one_day = port
            .fetch_candles(&sol(), CandleInterval::OneDay, 100)
            .await
            .unwrap();
        assert_ne!(one_minute, one_day);
        assert_eq!(one_day.len(), 1);

        let signals = ScannerService::default().scan_timeframes(&port, &sol()).await;
        assert_eq!(signals.len(), CandleInterval::ALL.len());

        let minute = &signals[0];
        let five = &signals[1];
        assert_eq!(minute.interval, CandleInterval::OneMinute);
        assert_ne!(minute.histogram, five.histogram);
        // too few daily candles for MACD
        assert_eq!(signals[5].histogram, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_token_has_no_data() {
        let dir = TempDir::new().unwrap();
        let port = JsonFileMarketData::new(dir.path());

        let series = port
            .fetch_candles(&sol(), CandleInterval::OneDay, 50)
            .await
            .unwrap();
        assert!(series.is_empty());

        let result = ScannerService::default()
            .analyze_token(&port, &sol(), CandleInterval::OneDay, 50)
            .await;
        assert!(matches!(result, Err(ScanError::NoData(_))));
    }

    #[tokio::test]
    async fn test_backtest_over_file_candles() {
        let dir = TempDir::new().unwrap();
        write_token_file(&dir, &wave(250));

        let port = JsonFileMarketData::new(dir.path());
        let series = port
            .fetch_candles(&sol(), CandleInterval::OneHour, 250)
            .await
            .unwrap();

        let service = ScannerService::default();
        let mut strategy = macd_scanner::strategy::MacdCrossoverStrategy::new();
        let report = service.run_backtest(series.candles(), &mut strategy).unwrap();

        assert!(!report.trades.is_empty());
        assert!(report.trades.iter().all(|t| !t.is_open));
        assert_eq!(report.metrics.closed_trades, report.trades.len());

        let walk = service
            .walk_forward(series.candles(), &mut strategy, BacktestConfig::default(), 100, 20)
            .unwrap();
        assert_eq!(walk.windows(), walk.out_of_sample.len());
        assert!(walk.windows() > 0);
    }
}
