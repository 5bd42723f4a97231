//! MACD Engine
//!
//! MACD line = EMA(fast) - EMA(slow), signal = EMA(MACD, signal period),
//! histogram = MACD - signal.
//!
//! Every call is a full recomputation from the prices it is given. The EMA
//! prefix series are built in a single pass, so a call is O(n).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ema::EmaCalculator;
use super::params::MacdParams;
use crate::domain::Candle;

/// Output of one MACD calculation.
///
/// The three histories share one index space: `histogram_history[i] ==
/// macd_history[i] - signal_history[i]`. All histories are empty when the
/// input was too short.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub macd_history: Vec<f64>,
    pub signal_history: Vec<f64>,
    pub histogram_history: Vec<f64>,
}

impl MacdResult {
    /// Zeroed result for insufficient data
    pub fn empty(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// True when the result carries no computed history
    pub fn is_empty(&self) -> bool {
        self.macd_history.is_empty()
    }

    /// `macd - signal`
    pub fn spread(&self) -> f64 {
        self.macd - self.signal
    }
}

/// Signal-line crossover between two consecutive results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Crossover {
    /// MACD crossed above signal
    Bullish,
    /// MACD crossed below signal
    Bearish,
    None,
}

/// MACD calculator bound to one set of periods
#[derive(Debug, Clone, Copy, Default)]
pub struct MacdCalculator {
    params: MacdParams,
}

impl MacdCalculator {
    pub fn new(params: MacdParams) -> Self {
        Self { params }
    }

    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(MacdParams::new(fast, slow, signal))
    }

    pub fn params(&self) -> &MacdParams {
        &self.params
    }

    /// Calculate MACD over `prices`, stamped with the current wall-clock time
    pub fn calculate(&self, prices: &[f64]) -> MacdResult {
        self.calculate_at(prices, chrono::Utc::now().timestamp_millis())
    }

    /// Calculate MACD over candle closes, stamped with the last candle's time
    pub fn calculate_from_candles(&self, candles: &[Candle]) -> MacdResult {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let timestamp = candles.last().map_or(0, |c| c.timestamp);
        self.calculate_at(&closes, timestamp)
    }

    /// Calculate MACD with an explicit timestamp
    pub fn calculate_at(&self, prices: &[f64], timestamp: i64) -> MacdResult {
        let MacdParams { fast_period, slow_period, signal_period } = self.params;

        if slow_period == 0 || signal_period == 0 || prices.len() < self.params.min_prices() {
            debug!(
                len = prices.len(),
                required = self.params.min_prices(),
                "Not enough prices for MACD"
            );
            return MacdResult::empty(timestamp);
        }

        let fast = EmaCalculator::prefix_series(prices, fast_period);
        let slow = EmaCalculator::prefix_series(prices, slow_period);

        let macd_line: Vec<f64> = fast[slow_period - 1..]
            .iter()
            .zip(&slow[slow_period - 1..])
            .map(|(f, s)| f - s)
            .collect();

        let signal_series = EmaCalculator::prefix_series(&macd_line, signal_period);
        let macd_history = macd_line[signal_period - 1..].to_vec();
        let signal_history = signal_series[signal_period - 1..].to_vec();
        let histogram_history: Vec<f64> = macd_history
            .iter()
            .zip(&signal_history)
            .map(|(m, s)| m - s)
            .collect();

        MacdResult {
            macd: macd_history.last().copied().unwrap_or(0.0),
            signal: signal_history.last().copied().unwrap_or(0.0),
            histogram: histogram_history.last().copied().unwrap_or(0.0),
            timestamp,
            macd_history,
            signal_history,
            histogram_history,
        }
    }

    /// Recalculate with fast/slow periods scaled by `volatility`, clamped to `[0.5, 2.0]`
    pub fn calculate_adaptive(&self, prices: &[f64], volatility: f64) -> MacdResult {
        let multiplier = if volatility.is_finite() {
            volatility.clamp(0.5, 2.0)
        } else {
            1.0
        };

        let fast = (self.params.fast_period as f64 * multiplier).round() as usize;
        let slow = (self.params.slow_period as f64 * multiplier).round() as usize;

        debug!(multiplier, fast, slow, "Adaptive MACD periods");
        Self::with_periods(fast, slow, self.params.signal_period).calculate(prices)
    }

    /// Compare the sign of `macd - signal` across two consecutive results
    pub fn detect_crossover(current: &MacdResult, previous: &MacdResult) -> Crossover {
        let prev = previous.spread();
        let curr = current.spread();

        if prev < 0.0 && curr > 0.0 {
            Crossover::Bullish
        } else if prev > 0.0 && curr < 0.0 {
            Crossover::Bearish
        } else {
            Crossover::None
        }
    }

    /// Percent change between the mean of the last 10 values and the 10 before.
    ///
    /// Returns 0 when there is no prior window or its mean is 0.
    pub fn calculate_momentum(macd_history: &[f64]) -> f64 {
        let len = macd_history.len();
        if len < 2 {
            return 0.0;
        }

        let recent = &macd_history[len.saturating_sub(10)..];
        let old = &macd_history[len.saturating_sub(20)..len.saturating_sub(10)];
        if old.is_empty() {
            return 0.0;
        }

        let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
        let old_avg = old.iter().sum::<f64>() / old.len() as f64;
        if old_avg == 0.0 {
            return 0.0;
        }

        (recent_avg - old_avg) / old_avg.abs() * 100.0
    }

    /// Composite strength in `[0, 100]`
    pub fn validate_signal_strength(result: &MacdResult) -> f64 {
        let histogram_strength = (result.histogram.abs() * 1000.0).min(50.0);
        let macd_strength = (result.macd.abs() * 100.0).min(30.0);
        let spread_strength = (result.spread().abs() * 100.0).min(20.0);

        (histogram_strength + macd_strength + spread_strength).min(100.0)
    }
}
