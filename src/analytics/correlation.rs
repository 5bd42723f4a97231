//! Correlation Analyzer
//!
//! Pearson and Spearman coefficients, correlation matrices, rolling
//! correlation and correlation-regime classification.
//!
//! Paired inputs of different lengths are a caller error
//! (`StatsError::LengthMismatch`). Empty or constant inputs give 0.

use serde::{Deserialize, Serialize};

use super::distribution::mean;
use super::statistics::StatsError;

/// |correlation| above this is HIGH
pub const HIGH_CORRELATION: f64 = 0.7;
/// |correlation| below this is LOW
pub const LOW_CORRELATION: f64 = 0.3;
/// Default lag count for autocorrelation
pub const DEFAULT_MAX_LAG: usize = 20;

/// Labelled symmetric correlation matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub matrix: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

/// Strength bucket of the latest correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationRegime {
    High,
    Low,
    Neutral,
}

/// Threshold crossings in a correlation series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRegimeChange {
    /// Indices where |correlation| crossed the threshold
    pub changes: Vec<usize>,
    pub current: CorrelationRegime,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationAnalyzer;

impl CorrelationAnalyzer {
    /// Pearson correlation coefficient
    pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64, StatsError> {
        ensure_same_len(x, y)?;
        Ok(pearson_unchecked(x, y))
    }

    /// Spearman rank correlation. Ties get ordinal ranks in input order.
    pub fn spearman(x: &[f64], y: &[f64]) -> Result<f64, StatsError> {
        ensure_same_len(x, y)?;
        if x.is_empty() {
            return Ok(0.0);
        }
        Ok(pearson_unchecked(&rank(x), &rank(y)))
    }

    /// Symmetric Pearson matrix with unit diagonal; labels default to `Series N`
    pub fn matrix(
        datasets: &[Vec<f64>],
        labels: Option<Vec<String>>,
    ) -> Result<CorrelationMatrix, StatsError> {
        let n = datasets.len();

        if let Some(first) = datasets.first() {
            for other in &datasets[1..] {
                ensure_same_len(first, other)?;
            }
        }

        let labels = match labels {
            Some(labels) if labels.len() != n => {
                return Err(StatsError::LengthMismatch { left: n, right: labels.len() });
            }
            Some(labels) => labels,
            None => (1..=n).map(|i| format!("Series {}", i)).collect(),
        };

        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                let r = pearson_unchecked(&datasets[i], &datasets[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }

        Ok(CorrelationMatrix { matrix, labels })
    }

    /// Pearson over each trailing window of `window` points
    pub fn rolling(x: &[f64], y: &[f64], window: usize) -> Result<Vec<f64>, StatsError> {
        if window == 0 {
            return Err(StatsError::InvalidWindow(window));
        }
        ensure_same_len(x, y)?;

        Ok(x.windows(window)
            .zip(y.windows(window))
            .map(|(wx, wy)| pearson_unchecked(wx, wy))
            .collect())
    }

    /// Indices where |correlation| crosses `threshold`, plus the current bucket
    pub fn detect_regime_change(correlations: &[f64], threshold: f64) -> CorrelationRegimeChange {
        let changes = correlations
            .windows(2)
            .enumerate()
            .filter(|(_, w)| {
                let prev = w[0].abs();
                let curr = w[1].abs();
                (prev < threshold && curr >= threshold) || (prev >= threshold && curr < threshold)
            })
            .map(|(i, _)| i + 1)
            .collect();

        let current = match correlations.last().map(|c| c.abs()) {
            Some(c) if c > HIGH_CORRELATION => CorrelationRegime::High,
            Some(c) if c < LOW_CORRELATION => CorrelationRegime::Low,
            _ => CorrelationRegime::Neutral,
        };

        CorrelationRegimeChange { changes, current }
    }

    /// Correlation of `x` and `y` controlling for `z`
    pub fn partial(x: &[f64], y: &[f64], z: &[f64]) -> Result<f64, StatsError> {
        let rxy = Self::pearson(x, y)?;
        let rxz = Self::pearson(x, z)?;
        let ryz = Self::pearson(y, z)?;

        let denominator = ((1.0 - rxz * rxz) * (1.0 - ryz * ryz)).sqrt();
        if denominator == 0.0 || !denominator.is_finite() {
            return Ok(0.0);
        }
        Ok((rxy - rxz * ryz) / denominator)
    }

    /// Autocorrelation for lags `0..=max_lag` (stops at the series length)
    pub fn autocorrelation(data: &[f64], max_lag: usize) -> Vec<f64> {
        (0..=max_lag)
            .take_while(|&lag| lag < data.len())
            .map(|lag| pearson_unchecked(&data[..data.len() - lag], &data[lag..]))
            .collect()
    }
}

fn ensure_same_len(x: &[f64], y: &[f64]) -> Result<(), StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch { left: x.len(), right: y.len() });
    }
    Ok(())
}

/// Caller guarantees equal lengths
fn pearson_unchecked(x: &[f64], y: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let (mut num, mut den_x, mut den_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    let den = (den_x * den_y).sqrt();
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// 1-based ordinal ranks; ties keep input order
fn rank(data: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data[a].total_cmp(&data[b]));

    let mut ranks = vec![0.0; data.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = (position + 1) as f64;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pearson_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let z = [8.0, 6.0, 4.0, 2.0];

        assert_relative_eq!(CorrelationAnalyzer::pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(CorrelationAnalyzer::pearson(&x, &z).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert_eq!(CorrelationAnalyzer::pearson(&[], &[]).unwrap(), 0.0);
        assert_eq!(CorrelationAnalyzer::pearson(&[1.0, 1.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let err = CorrelationAnalyzer::pearson(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, StatsError::LengthMismatch { left: 2, right: 1 });
        assert!(CorrelationAnalyzer::spearman(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_spearman_monotonic_nonlinear() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 8.0, 27.0, 64.0, 125.0];
        assert_relative_eq!(CorrelationAnalyzer::spearman(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rank_ties_are_ordinal() {
        assert_eq!(rank(&[3.0, 1.0, 3.0, 2.0]), vec![3.0, 1.0, 4.0, 2.0]);
    }

    #[test]
    fn test_matrix_is_symmetric_with_default_labels() {
        let datasets = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1.0, 3.0, 2.0, 4.0],
            vec![4.0, 3.0, 2.0, 1.0],
        ];
        let result = CorrelationAnalyzer::matrix(&datasets, None).unwrap();

        assert_eq!(result.labels, vec!["Series 1", "Series 2", "Series 3"]);
        for i in 0..3 {
            assert_eq!(result.matrix[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(result.matrix[i][j], result.matrix[j][i]);
            }
        }
        assert_relative_eq!(result.matrix[0][2], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_rejects_ragged_input() {
        let datasets = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(CorrelationAnalyzer::matrix(&datasets, None).is_err());

        let labels = Some(vec!["only".to_string()]);
        let datasets = vec![vec![1.0], vec![2.0]];
        assert!(CorrelationAnalyzer::matrix(&datasets, labels).is_err());
    }

    #[test]
    fn test_rolling_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 2.0, 3.0, 2.0, 1.0];

        let rolling = CorrelationAnalyzer::rolling(&x, &y, 3).unwrap();
        assert_eq!(rolling.len(), 3);
        assert_relative_eq!(rolling[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(rolling[2], -1.0, epsilon = 1e-12);

        assert!(CorrelationAnalyzer::rolling(&x, &y, 10).unwrap().is_empty());
        assert_eq!(
            CorrelationAnalyzer::rolling(&x, &y, 0),
            Err(StatsError::InvalidWindow(0))
        );
    }

    #[test]
    fn test_correlation_regime_change() {
        let series = [0.1, 0.2, 0.5, 0.9, 0.2];
        let result = CorrelationAnalyzer::detect_regime_change(&series, 0.3);

        assert_eq!(result.changes, vec![2, 4]);
        assert_eq!(result.current, CorrelationRegime::Low);

        let high = CorrelationAnalyzer::detect_regime_change(&[-0.8], 0.3);
        assert_eq!(high.current, CorrelationRegime::High);

        let empty = CorrelationAnalyzer::detect_regime_change(&[], 0.3);
        assert!(empty.changes.is_empty());
        assert_eq!(empty.current, CorrelationRegime::Neutral);
    }

    #[test]
    fn test_partial_correlation_removes_common_driver() {
        let z = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = [1.1, 2.0, 2.9, 4.2, 5.0, 5.8];
        let y = [0.9, 2.1, 3.0, 3.9, 5.1, 6.0];

        let raw = CorrelationAnalyzer::pearson(&x, &y).unwrap();
        let partial = CorrelationAnalyzer::partial(&x, &y, &z).unwrap();
        assert!(partial.abs() < raw.abs());
    }

    #[test]
    fn test_autocorrelation() {
        let data: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let acf = CorrelationAnalyzer::autocorrelation(&data, DEFAULT_MAX_LAG);

        assert_eq!(acf.len(), 21);
        assert_relative_eq!(acf[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(acf[5], 1.0, epsilon = 1e-12);

        assert_eq!(CorrelationAnalyzer::autocorrelation(&[1.0, 2.0], 20).len(), 2);
    }
}
