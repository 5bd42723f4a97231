//! MACD Scanner Library
//!
//! Technical and statistical analysis of Solana token price history:
//! MACD, risk statistics, market regime, divergence and backtesting.
//!
//! # Modules
//!
//! - `domain`: Core value types (Candle, PriceSeries, Trade, TokenAddress)
//! - `strategy`: Indicators and decisions (EMA, MACD, Regime, Divergence)
//! - `analytics`: Statistics, correlation, performance metrics, backtesting
//! - `ports`: Trait abstractions (MarketDataPort)
//! - `adapters`: External implementations (candle files, caching, CLI)
//! - `application`: Scanner service tying the engines together
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod analytics;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
