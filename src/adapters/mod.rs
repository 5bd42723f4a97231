//! Adapters Layer - External System Implementations
//!
//! - Market Data: `MarketDataPort` over candle files, plus TTL caching
//! - Cache: keyed TTL cache with an injectable clock
//! - CLI: Command-line interface handlers

pub mod cache;
pub mod cli;
pub mod market_data;

pub use cache::{CacheEntry, CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use cli::CliApp;
pub use market_data::{CachedMarketData, JsonFileMarketData};
