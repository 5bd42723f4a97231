//! Market Regime Detection Module
//!
//! Two independent classifiers behind one trait:
//!
//! - **EMA trend** (`EmaTrendDetector`): price vs EMA20 vs EMA50, primary
//! - **HMM scoring** (`HmmRegimeDetector`): ternary return observations
//!   scored against a fixed transition table
//!
//! They may disagree on the same input; neither overrides the other.

pub mod hmm;
pub mod random;
pub mod trend;

pub use hmm::{HmmRegimeDetector, HmmState};
pub use random::{FixedRandom, RandomSource, ThreadRandom};
pub use trend::EmaTrendDetector;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence a regime must exceed to count as a change
pub const REGIME_CHANGE_CONFIDENCE: f64 = 60.0;

/// Qualitative market state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Bullish,
    Bearish,
    Neutral,
    Transition,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Bullish => write!(f, "BULLISH"),
            Regime::Bearish => write!(f, "BEARISH"),
            Regime::Neutral => write!(f, "NEUTRAL"),
            Regime::Transition => write!(f, "TRANSITION"),
        }
    }
}

/// Output of a regime classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub regime: Regime,
    /// 0-100
    pub confidence: f64,
    /// Percent distance of price from the reference trend line
    pub trend: f64,
    /// Per-candle return volatility, percent
    pub volatility: f64,
}

impl MarketRegime {
    /// NEUTRAL with zero confidence, used for insufficient data
    pub fn neutral() -> Self {
        Self {
            regime: Regime::Neutral,
            confidence: 0.0,
            trend: 0.0,
            volatility: 0.0,
        }
    }
}

impl Default for MarketRegime {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Common interface for regime classifiers
pub trait RegimeDetector {
    /// Classify the market from prices and optional volumes
    fn detect(&mut self, prices: &[f64], volumes: Option<&[f64]>) -> MarketRegime;

    /// Short name for logs and reports
    fn name(&self) -> &'static str;
}

/// True when the regime flipped and the new reading is confident
pub fn detect_regime_change(current: &MarketRegime, previous: &MarketRegime) -> bool {
    current.regime != previous.regime && current.confidence > REGIME_CHANGE_CONFIDENCE
}
