//! Scanner Service
//!
//! Ties the indicator, statistics, regime and backtest engines to a
//! market data source. Pure computations are synchronous; only
//! `analyze_token` and `scan_timeframes` touch the port.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, StatisticalAnalyzer,
    StatisticalMetrics, StatisticsParams, StatsError, WalkForwardReport,
};
use crate::domain::{simple_returns, Candle, TokenAddress};
use crate::ports::{CandleInterval, MarketDataError, MarketDataPort, VolumeStats};
use crate::strategy::{
    ConfigError, DivergenceDetector, DivergenceKind, DivergenceParams, DivergenceSignal,
    EmaTrendDetector, HmmRegimeDetector, MacdCalculator, MacdParams, MacdResult, MarketRegime,
    RandomSource, RegimeDetector, RegimeMethod, RegimeParams, Strategy,
};

/// Default adaptive MACD volatility input
pub const DEFAULT_ADAPTIVE_VOLATILITY: f64 = 0.02;
/// |z| above this raises an alert
pub const EXTREME_Z_SCORE: f64 = 2.0;
/// Histogram magnitude below this is reported as neutral
pub const SIGNAL_DEADBAND: f64 = 0.001;
/// Candles fetched per interval by `scan_timeframes`
pub const TIMEFRAME_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid parameters: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid statistics settings: {0}")]
    Stats(#[from] StatsError),
    #[error("Invalid backtest settings: {0}")]
    Backtest(#[from] BacktestError),
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
    #[error("No price data available for {0}")]
    NoData(String),
}

/// How MACD periods are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Configured periods as-is
    #[default]
    Standard,
    /// Fast/slow periods scaled by the configured volatility
    Adaptive,
}

/// Direction implied by the MACD histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalBias {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalBias {
    pub fn from_histogram(histogram: f64) -> Self {
        if histogram > 0.0 {
            SignalBias::Bullish
        } else if histogram < 0.0 {
            SignalBias::Bearish
        } else {
            SignalBias::Neutral
        }
    }
}

/// Histogram scaled to a 0-100 strength
pub fn signal_strength(histogram: f64) -> f64 {
    (histogram.abs() * 10_000.0).min(100.0)
}

/// Conditions worth surfacing alongside a report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    ExtremeZScore { z_score: f64 },
    Divergence { direction: DivergenceKind, strength: f64 },
}

/// MACD reading for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeSignal {
    pub interval: CandleInterval,
    pub signal: SignalBias,
    pub strength: f64,
    pub histogram: f64,
}

/// Everything `analyze_token` learned about one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReport {
    pub token: TokenAddress,
    pub interval: CandleInterval,
    pub mode: AnalysisMode,
    pub candles: usize,
    pub current_price: f64,
    pub indicators: MacdResult,
    pub signal: SignalBias,
    pub signal_strength: f64,
    pub statistics: StatisticalMetrics,
    pub regime: MarketRegime,
    pub divergence: DivergenceSignal,
    pub volume: VolumeStats,
    pub alerts: Vec<Alert>,
}

/// Engine parameters for a scanner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScannerSettings {
    pub macd: MacdParams,
    pub regime: RegimeParams,
    pub divergence: DivergenceParams,
    pub statistics: StatisticsParams,
    pub backtest: BacktestConfig,
    pub adaptive_volatility: f64,
    pub mode: AnalysisMode,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            macd: MacdParams::default(),
            regime: RegimeParams::default(),
            divergence: DivergenceParams::default(),
            statistics: StatisticsParams::default(),
            backtest: BacktestConfig::default(),
            adaptive_volatility: DEFAULT_ADAPTIVE_VOLATILITY,
            mode: AnalysisMode::Standard,
        }
    }
}

impl ScannerSettings {
    pub fn validate(&self) -> Result<(), ScanError> {
        self.macd.validate()?;
        self.regime.validate()?;
        self.divergence.validate()?;
        self.statistics.validate()?;
        self.backtest.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ScannerService {
    settings: ScannerSettings,
    macd: MacdCalculator,
    stats: StatisticalAnalyzer,
    divergence: DivergenceDetector,
}

impl ScannerService {
    pub fn new(settings: ScannerSettings) -> Result<Self, ScanError> {
        settings.validate()?;
        Ok(Self {
            macd: MacdCalculator::new(settings.macd),
            stats: StatisticalAnalyzer::new(settings.statistics),
            divergence: DivergenceDetector::new(settings.divergence),
            settings,
        })
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.settings.mode = mode;
        self
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    pub fn compute_indicators(&self, prices: &[f64], mode: AnalysisMode) -> MacdResult {
        match mode {
            AnalysisMode::Standard => self.macd.calculate(prices),
            AnalysisMode::Adaptive => self
                .macd
                .calculate_adaptive(prices, self.settings.adaptive_volatility),
        }
    }

    pub fn compute_statistics(
        &self,
        prices: &[f64],
        returns: &[f64],
        peers: &[Vec<f64>],
    ) -> Result<StatisticalMetrics, StatsError> {
        self.stats.calculate_all_metrics(prices, returns, peers)
    }

    /// Regime by the configured method, with thread-local jitter
    pub fn compute_regime(&self, prices: &[f64], volumes: Option<&[f64]>) -> MarketRegime {
        match self.settings.regime.method {
            RegimeMethod::EmaTrend => {
                EmaTrendDetector::new(self.settings.regime).detect(prices, volumes)
            }
            RegimeMethod::Hmm => HmmRegimeDetector::new().detect(prices, volumes),
        }
    }

    /// Regime by the configured method, drawing jitter from `random`
    pub fn compute_regime_with<R: RandomSource>(
        &self,
        prices: &[f64],
        volumes: Option<&[f64]>,
        random: R,
    ) -> MarketRegime {
        match self.settings.regime.method {
            RegimeMethod::EmaTrend => {
                EmaTrendDetector::with_random(self.settings.regime, random).detect(prices, volumes)
            }
            RegimeMethod::Hmm => HmmRegimeDetector::new().detect(prices, volumes),
        }
    }

    /// Divergence between the trailing prices and the MACD history they produced
    pub fn detect_divergence(&self, prices: &[f64], macd_history: &[f64]) -> DivergenceSignal {
        let start = prices.len().saturating_sub(macd_history.len());
        self.divergence.detect(&prices[start..], macd_history)
    }

    /// Backtest with the configured settings
    pub fn run_backtest<S>(&self, candles: &[Candle], strategy: &mut S) -> Result<BacktestReport, ScanError>
    where
        S: Strategy + ?Sized,
    {
        self.run_backtest_with(candles, strategy, self.settings.backtest)
    }

    pub fn run_backtest_with<S>(
        &self,
        candles: &[Candle],
        strategy: &mut S,
        config: BacktestConfig,
    ) -> Result<BacktestReport, ScanError>
    where
        S: Strategy + ?Sized,
    {
        Ok(self.engine(config)?.run_backtest(candles, strategy))
    }

    pub fn walk_forward<S>(
        &self,
        candles: &[Candle],
        strategy: &mut S,
        config: BacktestConfig,
        window: usize,
        step: usize,
    ) -> Result<WalkForwardReport, ScanError>
    where
        S: Strategy + ?Sized,
    {
        Ok(self
            .engine(config)?
            .run_walk_forward_analysis(candles, strategy, window, step)?)
    }

    fn engine(&self, config: BacktestConfig) -> Result<BacktestEngine, BacktestError> {
        Ok(BacktestEngine::new(config)?
            .with_macd(self.settings.macd)
            .with_statistics(self.settings.statistics))
    }

    /// Fetch candles, price and volume for `token` and run every engine over them
    pub async fn analyze_token<P>(
        &self,
        port: &P,
        token: &TokenAddress,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<TokenReport, ScanError>
    where
        P: MarketDataPort + ?Sized,
    {
        info!(token = %token.short(), %interval, limit, "Analyzing token");

        let series = port.fetch_candles(token, interval, limit).await?;
        if series.is_empty() {
            warn!(token = %token.short(), "No candles returned");
            return Err(ScanError::NoData(token.to_string()));
        }
        debug!(candles = series.len(), "Retrieved candles");

        let prices = series.closes();
        let volumes = series.volumes();
        let returns = simple_returns(&prices);
        let mode = self.settings.mode;

        let mut indicators = self.compute_indicators(&prices, mode);
        if let Some(last) = series.last() {
            indicators.timestamp = last.timestamp;
        }
        let statistics = self.compute_statistics(&prices, &returns, &[])?;
        let regime = self.compute_regime(&prices, Some(&volumes));
        let divergence = self.detect_divergence(&prices, &indicators.macd_history);
        let volume = port.fetch_volume_24h(token).await?;
        let current_price = port.fetch_current_price(token).await?;

        let mut alerts = Vec::new();
        if statistics.z_score.abs() > EXTREME_Z_SCORE {
            alerts.push(Alert::ExtremeZScore {
                z_score: statistics.z_score,
            });
        }
        if !divergence.is_none() {
            alerts.push(Alert::Divergence {
                direction: divergence.kind,
                strength: divergence.strength,
            });
        }

        let signal = if indicators.histogram.abs() > SIGNAL_DEADBAND {
            SignalBias::from_histogram(indicators.histogram)
        } else {
            SignalBias::Neutral
        };

        info!(
            token = %token.short(),
            ?signal,
            regime = %regime.regime,
            alerts = alerts.len(),
            "Analysis complete"
        );

        Ok(TokenReport {
            token: token.clone(),
            interval,
            mode,
            candles: series.len(),
            current_price,
            signal,
            signal_strength: signal_strength(indicators.histogram),
            indicators,
            statistics,
            regime,
            divergence,
            volume,
            alerts,
        })
    }

    /// Standard MACD bias on every interval the source can serve. Intervals
    /// that fail to load report neutral.
    pub async fn scan_timeframes<P>(&self, port: &P, token: &TokenAddress) -> Vec<TimeframeSignal>
    where
        P: MarketDataPort + ?Sized,
    {
        let mut signals = Vec::with_capacity(CandleInterval::ALL.len());
        for interval in CandleInterval::ALL {
            let histogram = match port.fetch_candles(token, interval, TIMEFRAME_LIMIT).await {
                Ok(series) if !series.is_empty() => {
                    Some(self.macd.calculate(&series.closes()).histogram)
                }
                Ok(_) => None,
                Err(MarketDataError::UnsupportedInterval(reason)) => {
                    debug!(%interval, %reason, "Interval not served");
                    None
                }
                Err(e) => {
                    warn!(%interval, error = %e, "Timeframe fetch failed");
                    Some(0.0)
                }
            };

            if let Some(histogram) = histogram {
                signals.push(TimeframeSignal {
                    interval,
                    signal: SignalBias::from_histogram(histogram),
                    strength: signal_strength(histogram),
                    histogram,
                });
            }
        }
        signals
    }
}

impl Default for ScannerService {
    fn default() -> Self {
        let settings = ScannerSettings::default();
        Self {
            macd: MacdCalculator::new(settings.macd),
            stats: StatisticalAnalyzer::new(settings.statistics),
            divergence: DivergenceDetector::new(settings.divergence),
            settings,
        }
    }
}
