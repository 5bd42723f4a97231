//! Exponential Moving Average
//!
//! SMA-seeded EMA with smoothing factor `k = 2 / (period + 1)`:
//!
//! ```text
//! ema_0 = mean(data[..period])
//! ema_t = price_t * k + ema_{t-1} * (1 - k)
//! ```
//!
//! Degenerate input (empty data, zero period, fewer points than the period)
//! yields 0 rather than an error.

use std::collections::BTreeMap;

/// Stateless EMA engine
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaCalculator;

impl EmaCalculator {
    /// Smoothing factor for a period
    pub fn smoothing(period: usize) -> f64 {
        2.0 / (period as f64 + 1.0)
    }

    /// Final EMA value over `data`, 0 if `data.len() < period`
    pub fn calculate(data: &[f64], period: usize) -> f64 {
        if period == 0 || data.len() < period {
            return 0.0;
        }

        let k = Self::smoothing(period);
        let mut ema = sma(&data[..period]);
        for &price in &data[period..] {
            ema = price * k + ema * (1.0 - k);
        }
        ema
    }

    /// EMA seeded with `data[0]` and a caller-supplied alpha
    pub fn calculate_with_alpha(data: &[f64], alpha: f64) -> f64 {
        let Some((&first, rest)) = data.split_first() else {
            return 0.0;
        };

        rest.iter()
            .fold(first, |ema, &price| price * alpha + ema * (1.0 - alpha))
    }

    /// Single streaming step
    pub fn calculate_incremental(previous_ema: f64, current_price: f64, period: usize) -> f64 {
        if period == 0 {
            return previous_ema;
        }
        let k = Self::smoothing(period);
        current_price * k + previous_ema * (1.0 - k)
    }

    /// EMA of every prefix in one pass.
    ///
    /// `series[i] == calculate(&data[..=i], period)`, including the 0 entries
    /// for prefixes shorter than `period`.
    pub fn prefix_series(data: &[f64], period: usize) -> Vec<f64> {
        let mut series = vec![0.0; data.len()];
        if period == 0 || data.len() < period {
            return series;
        }

        let k = Self::smoothing(period);
        let mut ema = sma(&data[..period]);
        series[period - 1] = ema;

        for (i, &price) in data.iter().enumerate().skip(period) {
            ema = price * k + ema * (1.0 - k);
            series[i] = ema;
        }

        series
    }

    /// Final EMA for several periods at once
    pub fn calculate_multiple(data: &[f64], periods: &[usize]) -> BTreeMap<usize, f64> {
        periods
            .iter()
            .map(|&period| (period, Self::calculate(data, period)))
            .collect()
    }

    /// Double EMA: `2 * EMA - EMA(EMA)`
    pub fn calculate_dema(data: &[f64], period: usize) -> f64 {
        let ema1 = Self::calculate(data, period);
        let ema2 = Self::calculate(&Self::prefix_series(data, period), period);
        2.0 * ema1 - ema2
    }

    /// Triple EMA: `3 * EMA - 3 * EMA(EMA) + EMA(EMA(EMA))`
    pub fn calculate_tema(data: &[f64], period: usize) -> f64 {
        let first = Self::prefix_series(data, period);
        let second = Self::prefix_series(&first, period);

        let ema1 = Self::calculate(data, period);
        let ema2 = Self::calculate(&first, period);
        let ema3 = Self::calculate(&second, period);

        3.0 * ema1 - 3.0 * ema2 + ema3
    }
}

/// Arithmetic mean, 0 for empty input
pub fn sma(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}
