//! Descriptive statistics over plain `f64` slices.
//!
//! Variance and standard deviation are population moments (divide by `n`).

use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as zero
pub const STD_EPSILON: f64 = 1e-12;

/// Scale factor that makes MAD consistent with sigma for normal data
const MAD_SCALE: f64 = 0.6745;

/// Arithmetic mean, 0 for empty input
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance, 0 for fewer than two points
pub fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let avg = mean(data);
    data.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / data.len() as f64
}

/// Population standard deviation, 0 for fewer than two points
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Median, 0 for empty input
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sorted = sorted(data);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Linearly interpolated percentile, `p` in `[0, 100]`
pub fn percentile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sorted = sorted(data);
    let index = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let weight = index - lower as f64;

    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Ascending copy; NaNs sort last
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut out = data.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Robust z-score: `0.6745 * (value - median) / MAD`, 0 if MAD is 0
pub fn modified_z_score(value: f64, data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let med = median(data);
    let deviations: Vec<f64> = data.iter().map(|x| (x - med).abs()).collect();
    let mad = median(&deviations);

    if mad < STD_EPSILON {
        return 0.0;
    }
    MAD_SCALE * (value - med) / mad
}

/// Shape summary of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionStats {
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Third standardized moment
    pub skewness: f64,
    /// Excess kurtosis (normal = 0)
    pub kurtosis: f64,
}

impl DistributionStats {
    pub fn from_data(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self::default();
        }

        let avg = mean(data);
        let var = variance(data);
        let sd = var.sqrt();

        let (skewness, kurtosis) = if sd < STD_EPSILON {
            (0.0, 0.0)
        } else {
            let n = data.len() as f64;
            let m3 = data.iter().map(|x| ((x - avg) / sd).powi(3)).sum::<f64>() / n;
            let m4 = data.iter().map(|x| ((x - avg) / sd).powi(4)).sum::<f64>() / n;
            (m3, m4 - 3.0)
        };

        Self {
            mean: avg,
            median: median(data),
            variance: var,
            std_dev: sd,
            skewness,
            kurtosis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_moments() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0);
        assert_relative_eq!(variance(&data), 4.0);
        assert_relative_eq!(std_dev(&data), 2.0);
        assert_relative_eq!(median(&data), 4.5);
    }

    #[test]
    fn test_short_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&data, 50.0), 2.5);
        assert_relative_eq!(percentile(&data, 100.0), 4.0);
        assert_relative_eq!(percentile(&data, 0.0), 1.0);
    }

    #[test]
    fn test_modified_z_score() {
        let data = [1.0, 2.0, 3.0, 4.0, 100.0];
        // median 3, MAD 1
        assert_relative_eq!(modified_z_score(100.0, &data), 0.6745 * 97.0, epsilon = 1e-9);
        assert_eq!(modified_z_score(5.0, &[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_distribution_of_symmetric_sample() {
        let stats = DistributionStats::from_data(&[-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_relative_eq!(stats.mean, 0.0);
        assert_relative_eq!(stats.skewness, 0.0, epsilon = 1e-12);
        assert!(stats.kurtosis < 0.0);
    }

    #[test]
    fn test_distribution_of_constant_sample() {
        let stats = DistributionStats::from_data(&[3.0; 4]);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.skewness, 0.0);
        assert_eq!(stats.kurtosis, 0.0);
    }
}
