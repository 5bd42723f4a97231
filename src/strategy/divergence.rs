//! Price / MACD Divergence Detector
//!
//! Bullish: the last two price troughs make a lower low while the last two
//! MACD troughs make a higher low. Bearish: the last two price peaks make a
//! higher high while the MACD peaks make a lower high.
//!
//! Peaks and troughs use strict comparison with both neighbours.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::DivergenceParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceKind {
    Bullish,
    Bearish,
    None,
}

/// Detected divergence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivergenceSignal {
    #[serde(rename = "type")]
    pub kind: DivergenceKind,
    /// 0-100
    pub strength: f64,
    pub start_index: usize,
    pub end_index: usize,
    /// Percent
    pub price_change: f64,
    /// Percent
    pub macd_change: f64,
}

impl DivergenceSignal {
    pub fn none() -> Self {
        Self {
            kind: DivergenceKind::None,
            strength: 0.0,
            start_index: 0,
            end_index: 0,
            price_change: 0.0,
            macd_change: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == DivergenceKind::None
    }
}

impl Default for DivergenceSignal {
    fn default() -> Self {
        Self::none()
    }
}

/// Stateless divergence detector
#[derive(Debug, Clone, Copy, Default)]
pub struct DivergenceDetector {
    params: DivergenceParams,
}

impl DivergenceDetector {
    pub fn new(params: DivergenceParams) -> Self {
        Self { params }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(DivergenceParams {
            threshold,
            ..Default::default()
        })
    }

    pub fn detect(&self, prices: &[f64], macd_history: &[f64]) -> DivergenceSignal {
        let min = self.params.min_points;
        if prices.len() < min || macd_history.len() < min {
            debug!(
                prices = prices.len(),
                macd = macd_history.len(),
                required = min,
                "Not enough points for divergence"
            );
            return DivergenceSignal::none();
        }

        let bullish = self.check(
            prices,
            macd_history,
            &find_troughs(prices),
            &find_troughs(macd_history),
            DivergenceKind::Bullish,
        );
        let bearish = self.check(
            prices,
            macd_history,
            &find_peaks(prices),
            &find_peaks(macd_history),
            DivergenceKind::Bearish,
        );

        if bullish.strength > bearish.strength {
            bullish
        } else if bearish.strength > 0.0 {
            bearish
        } else {
            DivergenceSignal::none()
        }
    }

    fn check(
        &self,
        prices: &[f64],
        macd: &[f64],
        price_points: &[usize],
        macd_points: &[usize],
        kind: DivergenceKind,
    ) -> DivergenceSignal {
        let (Some((prev_p, last_p)), Some((prev_m, last_m))) =
            (last_two(price_points), last_two(macd_points))
        else {
            return DivergenceSignal::none();
        };

        let diverges = match kind {
            // lower low in price, higher low in MACD
            DivergenceKind::Bullish => {
                prices[last_p] < prices[prev_p] && macd[last_m] > macd[prev_m]
            }
            // higher high in price, lower high in MACD
            DivergenceKind::Bearish => {
                prices[last_p] > prices[prev_p] && macd[last_m] < macd[prev_m]
            }
            DivergenceKind::None => false,
        };

        if !diverges || prices[prev_p] == 0.0 || macd[prev_m] == 0.0 {
            return DivergenceSignal::none();
        }

        let price_change = (prices[last_p] - prices[prev_p]) / prices[prev_p];
        let macd_change = (macd[last_m] - macd[prev_m]) / macd[prev_m].abs();
        let strength = (macd_change - price_change).abs();

        if strength <= self.params.threshold {
            return DivergenceSignal::none();
        }

        DivergenceSignal {
            kind,
            strength: (strength * 100.0).min(100.0),
            start_index: prev_p,
            end_index: last_p,
            price_change: price_change * 100.0,
            macd_change: macd_change * 100.0,
        }
    }
}

/// Signed score in `[-100, 100]`, positive for bullish
pub fn divergence_score(signal: &DivergenceSignal) -> f64 {
    let direction = match signal.kind {
        DivergenceKind::Bullish => 1.0,
        DivergenceKind::Bearish => -1.0,
        DivergenceKind::None => return 0.0,
    };
    let magnitude = ((signal.price_change - signal.macd_change).abs() / 10.0).min(1.0);

    direction * (signal.strength / 100.0) * magnitude * 100.0
}

/// Indices strictly greater than both neighbours
pub fn find_peaks(data: &[f64]) -> Vec<usize> {
    (1..data.len().saturating_sub(1))
        .filter(|&i| data[i] > data[i - 1] && data[i] > data[i + 1])
        .collect()
}

/// Indices strictly less than both neighbours
pub fn find_troughs(data: &[f64]) -> Vec<usize> {
    (1..data.len().saturating_sub(1))
        .filter(|&i| data[i] < data[i - 1] && data[i] < data[i + 1])
        .collect()
}

fn last_two(points: &[usize]) -> Option<(usize, usize)> {
    match points {
        [.., prev, last] => Some((*prev, *last)),
        _ => None,
    }
}
