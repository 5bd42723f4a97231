//! JSON file market data
//!
//! Each token's candles live in `<candles_dir>/<mint>.json` as a plain JSON
//! array of `{timestamp, open, high, low, close, volume}` objects. Stored
//! candles are resampled up to the requested interval; intervals finer than
//! the stored resolution, or not a multiple of it, are unsupported.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::{resample, resolution, Candle, PriceSeries, TokenAddress};
use crate::ports::{CandleInterval, MarketDataError, MarketDataPort, VolumeStats};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct JsonFileMarketData {
    candles_dir: PathBuf,
}

impl JsonFileMarketData {
    pub fn new(candles_dir: impl Into<PathBuf>) -> Self {
        Self {
            candles_dir: candles_dir.into(),
        }
    }

    pub fn candles_dir(&self) -> &Path {
        &self.candles_dir
    }

    pub fn path_for(&self, token: &TokenAddress) -> PathBuf {
        self.candles_dir.join(format!("{}.json", token.as_str()))
    }

    /// Full stored history, sorted by timestamp. Missing file is an empty series.
    async fn load(&self, token: &TokenAddress) -> Result<Vec<Candle>, MarketDataError> {
        let path = self.path_for(token);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(token = %token.short(), path = %path.display(), "No candle file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut candles: Vec<Candle> = serde_json::from_str(&content)?;

        let before = candles.len();
        candles.retain(Candle::is_valid);
        if candles.len() != before {
            warn!(
                token = %token.short(),
                dropped = before - candles.len(),
                "Dropped malformed candles"
            );
        }

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataPort for JsonFileMarketData {
    async fn fetch_candles(
        &self,
        token: &TokenAddress,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError> {
        let stored = self.load(token).await?;
        let bucket_ms = interval.as_millis();

        let candles = match resolution(&stored) {
            Some(stored_ms) if bucket_ms < stored_ms || bucket_ms % stored_ms != 0 => {
                return Err(MarketDataError::UnsupportedInterval(format!(
                    "{} from {} ms candles",
                    interval, stored_ms
                )));
            }
            Some(stored_ms) if bucket_ms == stored_ms => stored,
            _ => resample(&stored, bucket_ms),
        };

        let start = candles.len().saturating_sub(limit);
        debug!(
            token = %token.short(),
            %interval,
            available = candles.len(),
            returned = candles.len() - start,
            "Loaded candles from file"
        );
        Ok(PriceSeries::new(candles[start..].to_vec()))
    }

    async fn fetch_current_price(&self, token: &TokenAddress) -> Result<f64, MarketDataError> {
        self.load(token)
            .await?
            .last()
            .map(|c| c.close)
            .ok_or_else(|| MarketDataError::UnknownToken(token.to_string()))
    }

    async fn fetch_volume_24h(&self, token: &TokenAddress) -> Result<VolumeStats, MarketDataError> {
        let candles = self.load(token).await?;
        let Some(last) = candles.last() else {
            return Ok(VolumeStats::default());
        };

        let day_start = last.timestamp - DAY_MS;
        let prev_start = day_start - DAY_MS;

        let (mut volume_24h, mut previous, mut count) = (0.0, 0.0, 0u64);
        for candle in &candles {
            if candle.timestamp > day_start {
                volume_24h += candle.volume;
                count += 1;
            } else if candle.timestamp > prev_start {
                previous += candle.volume;
            }
        }

        let volume_change = if previous > 0.0 {
            (volume_24h - previous) / previous * 100.0
        } else {
            0.0
        };

        // candle count stands in for trade count
        Ok(VolumeStats {
            volume_24h,
            volume_change,
            trades_24h: count,
        })
    }
}
