//! Ports Layer - Trait definitions for external dependencies
//!
//! The indicator core never performs I/O. Candles, prices and volume
//! statistics arrive through `MarketDataPort`, implemented by the adapters.

pub mod market_data;

pub use market_data::{CandleInterval, MarketDataError, MarketDataPort, VolumeStats};

#[cfg(test)]
pub use market_data::MockMarketDataPort;
