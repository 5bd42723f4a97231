//! Caching market data decorator
//!
//! Wraps any `MarketDataPort` with a price cache and a candle cache. Volume
//! statistics pass straight through.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::adapters::cache::{CacheStats, Clock, SystemClock, TtlCache};
use crate::domain::{PriceSeries, TokenAddress};
use crate::ports::{CandleInterval, MarketDataError, MarketDataPort, VolumeStats};

/// Default TTL for spot prices
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(60);
/// Default TTL for candle series
pub const DEFAULT_CANDLE_TTL: Duration = Duration::from_secs(300);

type CandleKey = (TokenAddress, CandleInterval, usize);

pub struct CachedMarketData<P, C = SystemClock> {
    inner: P,
    prices: Mutex<TtlCache<TokenAddress, f64, C>>,
    candles: Mutex<TtlCache<CandleKey, PriceSeries, C>>,
}

impl<P: MarketDataPort> CachedMarketData<P, SystemClock> {
    pub fn new(inner: P) -> Self {
        Self::with_clock(inner, DEFAULT_PRICE_TTL, DEFAULT_CANDLE_TTL, SystemClock)
    }

    pub fn with_ttls(inner: P, price_ttl: Duration, candle_ttl: Duration) -> Self {
        Self::with_clock(inner, price_ttl, candle_ttl, SystemClock)
    }
}

impl<P: MarketDataPort, C: Clock + Clone> CachedMarketData<P, C> {
    pub fn with_clock(inner: P, price_ttl: Duration, candle_ttl: Duration, clock: C) -> Self {
        let max = TtlCache::<TokenAddress, f64, C>::DEFAULT_MAX_ENTRIES;
        Self {
            inner,
            prices: Mutex::new(TtlCache::with_clock(price_ttl, max, clock.clone())),
            candles: Mutex::new(TtlCache::with_clock(candle_ttl, max, clock)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// (price cache, candle cache) statistics
    pub async fn stats(&self) -> (CacheStats, CacheStats) {
        let prices = self.prices.lock().await.stats();
        let candles = self.candles.lock().await.stats();
        (prices, candles)
    }

    pub async fn clear(&self) {
        self.prices.lock().await.clear();
        self.candles.lock().await.clear();
    }
}

#[async_trait]
impl<P, C> MarketDataPort for CachedMarketData<P, C>
where
    P: MarketDataPort,
    C: Clock + Clone + Send + Sync,
{
    async fn fetch_candles(
        &self,
        token: &TokenAddress,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError> {
        let key = (token.clone(), interval, limit);
        if let Some(series) = self.candles.lock().await.get(&key) {
            trace!(token = %token.short(), %interval, "Candle cache hit");
            return Ok(series.clone());
        }

        debug!(token = %token.short(), %interval, limit, "Candle cache miss");
        let series = self.inner.fetch_candles(token, interval, limit).await?;
        self.candles.lock().await.insert(key, series.clone());
        Ok(series)
    }

    async fn fetch_current_price(&self, token: &TokenAddress) -> Result<f64, MarketDataError> {
        if let Some(price) = self.prices.lock().await.get(token).copied() {
            trace!(token = %token.short(), price, "Price cache hit");
            return Ok(price);
        }

        debug!(token = %token.short(), "Price cache miss");
        let price = self.inner.fetch_current_price(token).await?;
        self.prices.lock().await.insert(token.clone(), price);
        Ok(price)
    }

    async fn fetch_volume_24h(&self, token: &TokenAddress) -> Result<VolumeStats, MarketDataError> {
        self.inner.fetch_volume_24h(token).await
    }
}
