//! Strategy Layer - Indicators, Regimes and Trading Decisions
//!
//! - `EmaCalculator`: SMA-seeded exponential moving averages
//! - `MacdCalculator`: MACD line, signal line and histogram
//! - `regime`: EMA-trend and HMM-style market regime classifiers
//! - `DivergenceDetector`: price / MACD peak and trough divergence
//! - `Strategy`: BUY / SELL / HOLD decisions fed to the backtest engine

pub mod divergence;
pub mod ema;
pub mod macd;
pub mod params;
pub mod regime;
pub mod signals;

pub use divergence::{divergence_score, DivergenceDetector, DivergenceKind, DivergenceSignal};
pub use ema::EmaCalculator;
pub use macd::{Crossover, MacdCalculator, MacdResult};
pub use params::{ConfigError, DivergenceParams, MacdParams, RegimeMethod, RegimeParams};
pub use regime::{
    detect_regime_change, EmaTrendDetector, FixedRandom, HmmRegimeDetector, HmmState,
    MarketRegime, RandomSource, Regime, RegimeDetector, ThreadRandom,
};
pub use signals::{BuyAndHoldStrategy, MacdCrossoverStrategy, Strategy};
