//! Market Data Adapters
//!
//! Implementations of `MarketDataPort`:
//! - `JsonFileMarketData`: candles read from `<dir>/<token>.json`
//! - `CachedMarketData`: TTL caching in front of any other port

mod cached;
mod json_file;

pub use cached::{CachedMarketData, DEFAULT_CANDLE_TTL, DEFAULT_PRICE_TTL};
pub use json_file::JsonFileMarketData;
