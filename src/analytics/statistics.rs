//! Statistics Engine
//!
//! Risk-adjusted return and tail-risk measures over return series.
//!
//! Every function is pure and total over ordinary market data: short
//! series, zero variance and zero denominators produce 0 (or another
//! neutral value), never an error. `StatsError` is reserved for caller
//! contract violations such as paired series of different lengths.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;
use tracing::debug;

use super::correlation::CorrelationAnalyzer;
use super::distribution::{mean, std_dev, STD_EPSILON};

/// Kelly output is capped at this percent
pub const MAX_KELLY_PERCENT: f64 = 25.0;

/// Contract violations in the statistics layer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("Series lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("Invalid window size: {0}")]
    InvalidWindow(usize),
    #[error("Invalid confidence level: {0} (must be strictly between 0 and 1)")]
    InvalidConfidence(f64),
}

/// Annualisation and risk settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsParams {
    /// Annual risk-free rate
    pub risk_free_rate: f64,
    /// Return periods per year
    pub periods_per_year: f64,
    /// VaR confidence used in summaries
    pub var_confidence: f64,
    /// Fraction applied by fractional Kelly
    pub kelly_fraction: f64,
}

impl Default for StatisticsParams {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
            var_confidence: 0.95,
            kelly_fraction: 0.5,
        }
    }
}

impl StatisticsParams {
    pub fn validate(&self) -> Result<(), StatsError> {
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(StatsError::InvalidConfidence(self.var_confidence));
        }
        Ok(())
    }
}

/// Summary risk statistics for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticalMetrics {
    pub sharpe_ratio: f64,
    /// `+inf` with no losing returns
    #[serde(with = "super::unbounded")]
    pub sortino_ratio: f64,
    /// Percent
    pub value_at_risk: f64,
    /// Percent
    pub max_drawdown: f64,
    /// Percent, 0-25
    pub kelly_criterion: f64,
    pub z_score: f64,
    pub correlation: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalAnalyzer {
    params: StatisticsParams,
}

impl StatisticalAnalyzer {
    pub fn new(params: StatisticsParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StatisticsParams {
        &self.params
    }

    /// `(mean * periods - rf) / (std * sqrt(periods))`
    pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let sd = std_dev(returns);
        if sd < STD_EPSILON {
            return 0.0;
        }
        (mean(returns) * periods - risk_free_rate) / (sd * periods.sqrt())
    }

    /// Sharpe with the RMS of negative returns as the risk term.
    ///
    /// With no negative returns: `+inf` if the mean return beats the
    /// risk-free rate, else 0.
    pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let avg = mean(returns);
        let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        if downside.is_empty() {
            return if avg > risk_free_rate { f64::INFINITY } else { 0.0 };
        }

        let downside_dev = (downside.iter().map(|r| r * r).sum::<f64>() / downside.len() as f64).sqrt();
        if downside_dev < STD_EPSILON {
            return 0.0;
        }

        (avg * periods - risk_free_rate) / (downside_dev * periods.sqrt())
    }

    /// Empirical VaR in percent: |sorted[floor((1 - c) * n)]| * 100.
    /// An index outside the sample gives 0.
    pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        let sorted = super::distribution::sorted(returns);
        let index = ((1.0 - confidence) * sorted.len() as f64).floor();
        if !(index >= 0.0) {
            return 0.0;
        }
        sorted.get(index as usize).map_or(0.0, |r| r.abs() * 100.0)
    }

    /// Mean loss beyond VaR in percent; falls back to VaR with an empty tail
    pub fn conditional_var(returns: &[f64], confidence: f64) -> f64 {
        let var = Self::value_at_risk(returns, confidence) / 100.0;
        let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= -var).collect();

        if tail.is_empty() {
            return var * 100.0;
        }
        mean(&tail).abs() * 100.0
    }

    /// Gaussian VaR in percent from the sample mean and deviation
    pub fn parametric_var(returns: &[f64], confidence: f64) -> Result<f64, StatsError> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(StatsError::InvalidConfidence(confidence));
        }
        if returns.len() < 2 {
            return Ok(0.0);
        }

        let normal =
            Normal::new(0.0, 1.0).map_err(|_| StatsError::InvalidConfidence(confidence))?;
        let z = normal.inverse_cdf(1.0 - confidence);
        let quantile = mean(returns) + z * std_dev(returns);

        Ok((-quantile).max(0.0) * 100.0)
    }

    /// Largest peak-to-trough decline in percent
    pub fn max_drawdown(prices: &[f64]) -> f64 {
        if prices.len() < 2 {
            return 0.0;
        }

        let mut peak = prices[0];
        let mut max_dd: f64 = 0.0;
        for &price in &prices[1..] {
            if price > peak {
                peak = price;
            }
            if peak > 0.0 {
                max_dd = max_dd.max((peak - price) / peak);
            }
        }
        max_dd * 100.0
    }

    /// Kelly fraction in percent, clamped to `[0, 25]`.
    ///
    /// `win_rate` is a probability; `avg_win` / `avg_loss` are magnitudes in
    /// any common unit.
    pub fn kelly_criterion(win_rate: f64, avg_win: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return 0.0;
        }

        let b = avg_win / avg_loss.abs();
        if !b.is_finite() || b <= 0.0 {
            return 0.0;
        }

        let p = win_rate;
        let q = 1.0 - p;
        let kelly = (p * b - q) / b;
        if !kelly.is_finite() {
            return 0.0;
        }

        (kelly * 100.0).clamp(0.0, MAX_KELLY_PERCENT)
    }

    pub fn fractional_kelly(win_rate: f64, avg_win: f64, avg_loss: f64, fraction: f64) -> f64 {
        Self::kelly_criterion(win_rate, avg_win, avg_loss) * fraction
    }

    /// `(value - mean) / std`, 0 for flat or short data
    pub fn z_score(value: f64, data: &[f64]) -> f64 {
        let sd = std_dev(data);
        if sd < STD_EPSILON {
            return 0.0;
        }
        (value - mean(data)) / sd
    }

    /// Pearson correlation matrix, diagonal 1
    pub fn correlation_matrix(datasets: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, StatsError> {
        Ok(CorrelationAnalyzer::matrix(datasets, None)?.matrix)
    }

    /// Annualised mean return over max drawdown (percent), 0 without drawdown
    pub fn calmar_ratio(returns: &[f64], max_drawdown: f64, periods: f64) -> f64 {
        if max_drawdown == 0.0 {
            return 0.0;
        }
        mean(returns) * periods / (max_drawdown / 100.0)
    }

    /// Mean excess return over tracking error
    pub fn information_ratio(returns: &[f64], benchmark: &[f64]) -> Result<f64, StatsError> {
        if returns.len() != benchmark.len() {
            return Err(StatsError::LengthMismatch {
                left: returns.len(),
                right: benchmark.len(),
            });
        }

        let excess: Vec<f64> = returns.iter().zip(benchmark).map(|(r, b)| r - b).collect();
        let tracking_error = std_dev(&excess);
        if tracking_error < STD_EPSILON {
            return Ok(0.0);
        }
        Ok(mean(&excess) / tracking_error)
    }

    pub fn sharpe(&self, returns: &[f64]) -> f64 {
        Self::sharpe_ratio(returns, self.params.risk_free_rate, self.params.periods_per_year)
    }

    pub fn sortino(&self, returns: &[f64]) -> f64 {
        Self::sortino_ratio(returns, self.params.risk_free_rate, self.params.periods_per_year)
    }

    pub fn var(&self, returns: &[f64]) -> f64 {
        Self::value_at_risk(returns, self.params.var_confidence)
    }

    /// Full summary for one token.
    ///
    /// Kelly inputs come from the return series itself; the correlation
    /// matrix covers `returns` followed by each peer series.
    pub fn calculate_all_metrics(
        &self,
        prices: &[f64],
        returns: &[f64],
        peers: &[Vec<f64>],
    ) -> Result<StatisticalMetrics, StatsError> {
        let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        let win_rate = if returns.is_empty() {
            0.0
        } else {
            wins.len() as f64 / returns.len() as f64
        };

        let mut datasets = Vec::with_capacity(peers.len() + 1);
        datasets.push(returns.to_vec());
        datasets.extend(peers.iter().cloned());
        let correlation = Self::correlation_matrix(&datasets)?;

        let metrics = StatisticalMetrics {
            sharpe_ratio: self.sharpe(returns),
            sortino_ratio: self.sortino(returns),
            value_at_risk: self.var(returns),
            max_drawdown: Self::max_drawdown(prices),
            kelly_criterion: Self::kelly_criterion(win_rate, mean(&wins), mean(&losses).abs()),
            z_score: returns.last().map_or(0.0, |&r| Self::z_score(r, returns)),
            correlation,
        };

        debug!(
            sharpe = metrics.sharpe_ratio,
            var = metrics.value_at_risk,
            drawdown = metrics.max_drawdown,
            "Statistics computed"
        );

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    type S = StatisticalAnalyzer;

    const RETURNS: [f64; 10] = [0.02, -0.01, 0.03, -0.04, 0.01, 0.05, -0.02, 0.0, -0.06, 0.04];

    #[test]
    fn test_sharpe_zero_variance() {
        assert_eq!(S::sharpe_ratio(&[0.01; 5], 0.02, 252.0), 0.0);
        assert_eq!(S::sharpe_ratio(&[0.01], 0.02, 252.0), 0.0);
    }

    #[test]
    fn test_sharpe_formula() {
        let returns = [0.01, 0.03];
        // mean 0.02, population std 0.01
        let expected = (0.02 * 252.0 - 0.02) / (0.01 * 252f64.sqrt());
        assert_relative_eq!(S::sharpe_ratio(&returns, 0.02, 252.0), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sortino_without_losses() {
        assert_eq!(S::sortino_ratio(&[0.05, 0.06], 0.02, 252.0), f64::INFINITY);
        assert_eq!(S::sortino_ratio(&[0.001, 0.002], 0.02, 252.0), 0.0);
    }

    #[test]
    fn test_infinite_sortino_survives_json() {
        let prices = [100.0, 105.0, 111.0, 118.0];
        let returns = crate::domain::simple_returns(&prices);
        let metrics = S::default().calculate_all_metrics(&prices, &returns, &[]).unwrap();
        assert_eq!(metrics.sortino_ratio, f64::INFINITY);

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["sortinoRatio"], "Infinity");

        let back: StatisticalMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(back, metrics);
    }

    #[test]
    fn test_sortino_uses_downside_rms() {
        let returns = [0.04, -0.02];
        let expected = (0.01 * 252.0 - 0.02) / (0.02 * 252f64.sqrt());
        assert_relative_eq!(S::sortino_ratio(&returns, 0.02, 252.0), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_var_and_cvar() {
        // sorted: -0.06 -0.04 -0.02 -0.01 0.0 ...; floor(0.05 * 10) = 0
        assert_relative_eq!(S::value_at_risk(&RETURNS, 0.95), 6.0, epsilon = 1e-9);
        // floor(0.25 * 10) = 2
        assert_relative_eq!(S::value_at_risk(&RETURNS, 0.75), 2.0, epsilon = 1e-9);
        // only -0.06 sits at or beyond the 95% VaR
        assert_relative_eq!(S::conditional_var(&RETURNS, 0.95), 6.0, epsilon = 1e-9);
        assert!(S::conditional_var(&RETURNS, 0.5) >= S::value_at_risk(&RETURNS, 0.5));
        assert_eq!(S::value_at_risk(&[], 0.95), 0.0);
    }

    #[test]
    fn test_var_outside_sample_is_zero() {
        // (1 - 1.5) * 10 floors to -5
        assert_eq!(S::value_at_risk(&RETURNS, 1.5), 0.0);
        // (1 - -1.0) * 10 = 20 is past the end
        assert_eq!(S::value_at_risk(&RETURNS, -1.0), 0.0);
        assert_eq!(S::value_at_risk(&RETURNS, f64::NAN), 0.0);
    }

    #[test]
    fn test_var_monotonic_in_confidence() {
        let mut previous = 0.0;
        for c in [0.5, 0.75, 0.9, 0.95, 0.99] {
            let var = S::value_at_risk(&RETURNS, c);
            assert!(var >= previous);
            previous = var;
        }
    }

    #[test]
    fn test_parametric_var() {
        assert!(S::parametric_var(&RETURNS, 1.5).is_err());
        let var95 = S::parametric_var(&RETURNS, 0.95).unwrap();
        let var99 = S::parametric_var(&RETURNS, 0.99).unwrap();
        assert!(var99 > var95);
        assert!(var95 > 0.0);
    }

    #[test]
    fn test_max_drawdown_scenarios() {
        assert_relative_eq!(S::max_drawdown(&[100.0, 90.0, 95.0, 80.0, 110.0]), 20.0, epsilon = 1e-9);
        assert_eq!(S::max_drawdown(&[1.0, 2.0, 3.0, 4.0]), 0.0);
        assert_relative_eq!(S::max_drawdown(&[100.0, 80.0, 60.0, 50.0]), 50.0, epsilon = 1e-9);
        assert_eq!(S::max_drawdown(&[5.0]), 0.0);
    }

    #[test]
    fn test_kelly_bounds() {
        assert_eq!(S::kelly_criterion(0.55, 0.02, 0.0), 0.0);
        assert_eq!(S::kelly_criterion(0.9, 5.0, 1.0), 25.0);
        assert_eq!(S::kelly_criterion(0.1, 1.0, 1.0), 0.0);

        // p=0.6, b=1 -> 20%
        assert_relative_eq!(S::kelly_criterion(0.6, 1.0, 1.0), 20.0, epsilon = 1e-9);
        assert_relative_eq!(S::fractional_kelly(0.6, 1.0, 1.0, 0.5), 10.0, epsilon = 1e-9);

        for p in [0.0, 0.3, 0.5, 0.7, 1.0] {
            for w in [0.001, 0.5, 3.0] {
                for l in [-2.0, 0.01, 1.0] {
                    let k = S::kelly_criterion(p, w, l);
                    assert!((0.0..=25.0).contains(&k));
                }
            }
        }
    }

    #[test]
    fn test_z_score() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(S::z_score(3.0, &data), 0.0);
        assert_relative_eq!(S::z_score(5.0, &data), 2.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(S::z_score(5.0, &[2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_calmar_and_information_ratio() {
        assert_eq!(S::calmar_ratio(&RETURNS, 0.0, 252.0), 0.0);
        assert_relative_eq!(S::calmar_ratio(&[0.01, 0.01], 10.0, 252.0), 25.2, epsilon = 1e-9);

        let ir = S::information_ratio(&[0.02, 0.04], &[0.01, 0.01]).unwrap();
        // excess 0.01, 0.03 -> mean 0.02, std 0.01
        assert_relative_eq!(ir, 2.0, epsilon = 1e-9);
        assert!(S::information_ratio(&[0.1], &[]).is_err());
    }

    #[test]
    fn test_all_metrics_without_peers() {
        let prices = [100.0, 102.0, 99.0, 103.0, 101.0];
        let returns = crate::domain::candle::simple_returns(&prices);
        let metrics = StatisticalAnalyzer::default()
            .calculate_all_metrics(&prices, &returns, &[])
            .unwrap();

        assert_eq!(metrics.correlation, vec![vec![1.0]]);
        assert!((0.0..=25.0).contains(&metrics.kelly_criterion));
        assert!(metrics.max_drawdown > 0.0);
    }

    #[test]
    fn test_all_metrics_rejects_mismatched_peer() {
        let returns = [0.01, -0.01, 0.02];
        let result = StatisticalAnalyzer::default().calculate_all_metrics(&[], &returns, &[vec![0.1]]);
        assert!(matches!(result, Err(StatsError::LengthMismatch { .. })));
    }

    #[test]
    fn test_deterministic() {
        let a = StatisticalAnalyzer::default().calculate_all_metrics(&[1.0, 2.0, 1.5], &RETURNS, &[]);
        let b = StatisticalAnalyzer::default().calculate_all_metrics(&[1.0, 2.0, 1.5], &RETURNS, &[]);
        assert_eq!(a, b);
    }
}
