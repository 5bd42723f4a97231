//! EMA Trend Regime Detector
//!
//! Orders the current price against EMA20 and EMA50, each taken over its
//! own trailing window:
//!
//! - price > EMA20 > EMA50 → BULLISH
//! - price < EMA20 < EMA50 → BEARISH
//! - otherwise → TRANSITION, with confidence 50 ± 10 drawn from the
//!   injected random source
//!
//! Confidence is then damped in high volatility, scaled by the volume
//! trend when volumes are supplied, and clamped to `[0, 100]`.

use tracing::debug;

use super::random::{RandomSource, ThreadRandom};
use super::{MarketRegime, Regime, RegimeDetector};
use crate::analytics::distribution::{mean, std_dev};
use crate::domain::candle::simple_returns;
use crate::strategy::ema::EmaCalculator;
use crate::strategy::params::RegimeParams;

const VOLUME_WINDOW: usize = 10;

/// Primary regime classifier
#[derive(Debug, Clone)]
pub struct EmaTrendDetector<R = ThreadRandom> {
    params: RegimeParams,
    random: R,
}

impl EmaTrendDetector<ThreadRandom> {
    pub fn new(params: RegimeParams) -> Self {
        Self::with_random(params, ThreadRandom)
    }
}

impl Default for EmaTrendDetector<ThreadRandom> {
    fn default() -> Self {
        Self::new(RegimeParams::default())
    }
}

impl<R: RandomSource> EmaTrendDetector<R> {
    pub fn with_random(params: RegimeParams, random: R) -> Self {
        Self { params, random }
    }

    pub fn params(&self) -> &RegimeParams {
        &self.params
    }

    /// Ratio of the last 10 volumes to the 10 before, clamped to `[0.5, 1.5]`
    pub fn volume_trend(volumes: &[f64]) -> f64 {
        let len = volumes.len();
        if len < VOLUME_WINDOW * 2 {
            return 1.0;
        }

        let recent = mean(&volumes[len - VOLUME_WINDOW..]);
        let old = mean(&volumes[len - 2 * VOLUME_WINDOW..len - VOLUME_WINDOW]);
        if old == 0.0 {
            return 1.0;
        }

        (recent / old).clamp(0.5, 1.5)
    }
}

impl<R: RandomSource> RegimeDetector for EmaTrendDetector<R> {
    fn detect(&mut self, prices: &[f64], volumes: Option<&[f64]>) -> MarketRegime {
        let len = prices.len();
        let required = self
            .params
            .min_prices
            .max(self.params.long_period)
            .max(self.params.short_period);
        if len < required {
            debug!(len, required, "Not enough prices for regime");
            return MarketRegime::neutral();
        }

        let short = self.params.short_period;
        let long = self.params.long_period;
        let ema_short = EmaCalculator::calculate(&prices[len - short..], short);
        let ema_long = EmaCalculator::calculate(&prices[len - long..], long);
        let price = prices[len - 1];

        let volatility = std_dev(&simple_returns(prices));

        let (regime, trend, mut confidence) = if price > ema_short && ema_short > ema_long {
            let trend = (price / ema_long - 1.0) * 100.0;
            (Regime::Bullish, trend, (trend.abs() * 2.0).min(100.0))
        } else if price < ema_short && ema_short < ema_long {
            let trend = (price / ema_long - 1.0) * 100.0;
            (Regime::Bearish, trend, (trend.abs() * 2.0).min(100.0))
        } else {
            let trend = (price / ema_short - 1.0) * 100.0;
            let jitter = self.random.next_f64() * 20.0 - 10.0;
            (Regime::Transition, trend, 50.0 + jitter)
        };

        if volatility > self.params.high_volatility {
            confidence *= self.params.volatility_damping;
        }

        if let Some(volumes) = volumes.filter(|v| !v.is_empty()) {
            confidence *= Self::volume_trend(volumes);
        }

        debug!(%regime, ema_short, ema_long, confidence, "Regime classified");

        MarketRegime {
            regime,
            confidence: confidence.clamp(0.0, 100.0),
            trend,
            volatility: volatility * 100.0,
        }
    }

    fn name(&self) -> &'static str {
        "ema_trend"
    }
}
