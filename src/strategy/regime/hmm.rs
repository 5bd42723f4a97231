//! HMM-style regime scoring
//!
//! Returns are reduced to ternary observations (+1 above 1%, -1 below -1%,
//! 0 otherwise). Each hidden state starts at 0.33 and is multiplied by 1.2
//! for every one of the last 10 observations that matches it, 0.8 for every
//! one that does not, capped at 1. The best-scoring state wins; ties go to
//! the earlier state in `HmmState::ALL`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MarketRegime, Regime, RegimeDetector};
use crate::analytics::distribution::std_dev;
use crate::domain::candle::simple_returns;

const INITIAL_PROBABILITY: f64 = 0.33;
const MATCH_FACTOR: f64 = 1.2;
const MISMATCH_FACTOR: f64 = 0.8;
const OBSERVATION_WINDOW: usize = 10;
const OBSERVATION_THRESHOLD: f64 = 0.01;
const TREND_LOOKBACK: usize = 20;

/// Hidden states of the scoring model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HmmState {
    Bullish,
    Bearish,
    Neutral,
}

/// Row = from, column = to, indexed by `HmmState::index`
const TRANSITIONS: [[f64; 3]; 3] = [
    // Bullish
    [0.7, 0.1, 0.2],
    // Bearish
    [0.1, 0.7, 0.2],
    // Neutral
    [0.3, 0.3, 0.4],
];

impl HmmState {
    pub const ALL: [HmmState; 3] = [HmmState::Bullish, HmmState::Bearish, HmmState::Neutral];

    fn index(self) -> usize {
        match self {
            HmmState::Bullish => 0,
            HmmState::Bearish => 1,
            HmmState::Neutral => 2,
        }
    }

    /// Ternary observation this state emits
    pub fn observation(self) -> i8 {
        match self {
            HmmState::Bullish => 1,
            HmmState::Bearish => -1,
            HmmState::Neutral => 0,
        }
    }

    /// P(next = `to` | current = self)
    pub fn transition_probability(self, to: HmmState) -> f64 {
        TRANSITIONS[self.index()][to.index()]
    }

    /// Most probable successor state
    pub fn most_likely_next(self) -> HmmState {
        let mut best = self;
        let mut best_p = f64::MIN;
        for to in Self::ALL {
            let p = self.transition_probability(to);
            if p > best_p {
                best = to;
                best_p = p;
            }
        }
        best
    }
}

impl From<HmmState> for Regime {
    fn from(state: HmmState) -> Self {
        match state {
            HmmState::Bullish => Regime::Bullish,
            HmmState::Bearish => Regime::Bearish,
            HmmState::Neutral => Regime::Neutral,
        }
    }
}

/// Alternative regime classifier over return observations
#[derive(Debug, Clone, Copy, Default)]
pub struct HmmRegimeDetector;

impl HmmRegimeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Ternary observations of each return
    pub fn observations(prices: &[f64]) -> Vec<i8> {
        simple_returns(prices)
            .into_iter()
            .map(|r| {
                if r > OBSERVATION_THRESHOLD {
                    1
                } else if r < -OBSERVATION_THRESHOLD {
                    -1
                } else {
                    0
                }
            })
            .collect()
    }

    /// Score of one state against the recent observations, in `(0, 1]`
    pub fn state_score(state: HmmState, observations: &[i8]) -> f64 {
        let recent = &observations[observations.len().saturating_sub(OBSERVATION_WINDOW)..];
        let score = recent.iter().fold(INITIAL_PROBABILITY, |p, &obs| {
            if obs == state.observation() {
                p * MATCH_FACTOR
            } else {
                p * MISMATCH_FACTOR
            }
        });
        score.min(1.0)
    }

    /// Percent change over the last 20 prices
    fn trend(prices: &[f64]) -> f64 {
        let len = prices.len();
        if len < 2 {
            return 0.0;
        }
        let first = prices[len.saturating_sub(TREND_LOOKBACK)];
        let last = prices[len - 1];
        if first == 0.0 {
            return 0.0;
        }
        (last - first) / first * 100.0
    }
}

impl RegimeDetector for HmmRegimeDetector {
    fn detect(&mut self, prices: &[f64], _volumes: Option<&[f64]>) -> MarketRegime {
        let observations = Self::observations(prices);

        let mut state = HmmState::Neutral;
        let mut best = 0.0;
        for candidate in HmmState::ALL {
            let score = Self::state_score(candidate, &observations);
            if score > best {
                best = score;
                state = candidate;
            }
        }

        debug!(?state, score = best, observations = observations.len(), "HMM regime scored");

        MarketRegime {
            regime: state.into(),
            confidence: best * 100.0,
            trend: Self::trend(prices),
            volatility: std_dev(&simple_returns(prices)) * 100.0,
        }
    }

    fn name(&self) -> &'static str {
        "hmm"
    }
}
