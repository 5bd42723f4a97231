//! Candles and price series
//!
//! A `PriceSeries` is an ordered run of OHLCV candles. Insertion order is
//! chronological order; the series never re-sorts what it is given.

use serde::{Deserialize, Serialize};

/// One OHLCV candle. `timestamp` is Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { timestamp, open, high, low, close, volume }
    }

    /// Flat candle at a single price, handy for close-only feeds
    pub fn from_close(timestamp: i64, close: f64) -> Self {
        Self::new(timestamp, close, close, close, close, 0.0)
    }

    /// Validate OHLC data integrity. Prices must be strictly positive.
    pub fn is_valid(&self) -> bool {
        self.low > 0.0
            && self.high >= self.low
            && self.close >= self.low
            && self.close <= self.high
            && self.open >= self.low
            && self.open <= self.high
            && self.volume >= 0.0
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.open.is_finite()
    }
}

/// Chronologically ordered candles for one token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Build a series from bare closes, one candle per index
    pub fn from_closes(closes: &[f64]) -> Self {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::from_close(i as i64, c))
            .collect();
        Self { candles }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Simple returns, `len() - 1` of them
    pub fn returns(&self) -> Vec<f64> {
        simple_returns(&self.closes())
    }

    /// True when timestamps are strictly increasing
    pub fn is_chronological(&self) -> bool {
        self.candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// Sub-series over an index range, clamped to the series bounds
    pub fn slice(&self, start: usize, end: usize) -> PriceSeries {
        let end = end.min(self.candles.len());
        let start = start.min(end);
        Self::new(self.candles[start..end].to_vec())
    }
}

impl From<Vec<Candle>> for PriceSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

/// Smallest gap between consecutive timestamps, `None` below two candles
pub fn resolution(candles: &[Candle]) -> Option<i64> {
    candles
        .windows(2)
        .map(|w| w[1].timestamp - w[0].timestamp)
        .filter(|gap| *gap > 0)
        .min()
}

/// Aggregate ascending candles into `bucket_ms` buckets keyed by
/// `timestamp / bucket_ms`. Each bucket opens at the first open, closes at
/// the last close, spans the extreme high/low and sums volume.
pub fn resample(candles: &[Candle], bucket_ms: i64) -> Vec<Candle> {
    if bucket_ms <= 0 {
        return candles.to_vec();
    }

    let mut out: Vec<Candle> = Vec::new();
    for candle in candles {
        let start = candle.timestamp.div_euclid(bucket_ms) * bucket_ms;
        match out.last_mut() {
            Some(bucket) if bucket.timestamp == start => {
                bucket.high = bucket.high.max(candle.high);
                bucket.low = bucket.low.min(candle.low);
                bucket.close = candle.close;
                bucket.volume += candle.volume;
            }
            _ => out.push(Candle { timestamp: start, ..*candle }),
        }
    }
    out
}

/// `returns[i] = (prices[i+1] - prices[i]) / prices[i]`
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_candle_validation() {
        let valid = Candle::new(0, 100.0, 105.0, 95.0, 102.0, 1000.0);
        assert!(valid.is_valid());

        // high < low
        let invalid = Candle::new(0, 100.0, 95.0, 105.0, 100.0, 1000.0);
        assert!(!invalid.is_valid());

        // close outside range
        let invalid2 = Candle::new(0, 100.0, 105.0, 95.0, 110.0, 1000.0);
        assert!(!invalid2.is_valid());

        // zero price would divide by zero downstream
        let zero = Candle::new(0, 0.0, 0.0, 0.0, 0.0, 10.0);
        assert!(!zero.is_valid());
    }

    #[test]
    fn test_resample_aggregates_buckets() {
        let minute = 60_000;
        let candles = vec![
            Candle::new(0, 10.0, 12.0, 9.0, 11.0, 1.0),
            Candle::new(minute, 11.0, 15.0, 10.0, 14.0, 2.0),
            Candle::new(2 * minute, 14.0, 14.0, 8.0, 9.0, 3.0),
            Candle::new(5 * minute, 9.0, 10.0, 9.0, 10.0, 4.0),
        ];

        let buckets = resample(&candles, 5 * minute);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0], Candle::new(0, 10.0, 15.0, 8.0, 9.0, 6.0));
        assert_eq!(buckets[1], Candle::new(5 * minute, 9.0, 10.0, 9.0, 10.0, 4.0));
    }

    #[test]
    fn test_resolution_is_smallest_gap() {
        let candles: Vec<Candle> = [0, 60, 180, 240]
            .iter()
            .map(|&t| Candle::from_close(t, 1.0))
            .collect();
        assert_eq!(resolution(&candles), Some(60));
        assert_eq!(resolution(&candles[..1]), None);
    }

    #[test]
    fn test_returns_length_and_values() {
        let series = PriceSeries::from_closes(&[100.0, 110.0, 99.0]);
        let returns = series.returns();

        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_returns_of_short_series_is_empty() {
        assert!(PriceSeries::from_closes(&[42.0]).returns().is_empty());
        assert!(PriceSeries::default().returns().is_empty());
    }

    #[test]
    fn test_chronological_check() {
        let ordered = PriceSeries::from_closes(&[1.0, 2.0, 3.0]);
        assert!(ordered.is_chronological());

        let mut shuffled = ordered.clone();
        shuffled.push(Candle::from_close(0, 4.0));
        assert!(!shuffled.is_chronological());
    }

    #[test]
    fn test_slice_is_clamped() {
        let series = PriceSeries::from_closes(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.slice(1, 3).closes(), vec![2.0, 3.0]);
        assert_eq!(series.slice(2, 99).closes(), vec![3.0, 4.0]);
        assert!(series.slice(10, 20).is_empty());
    }

    #[test]
    fn test_series_json_is_plain_array() {
        let series = PriceSeries::new(vec![Candle::new(1, 1.0, 2.0, 0.5, 1.5, 10.0)]);
        let json = serde_json::to_string(&series).unwrap();
        assert!(json.starts_with('['));

        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
    }
}
