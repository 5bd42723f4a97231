//! Domain Layer - Core value types for the scanner
//!
//! Pure data with no I/O: candles and price series, simulated trades and
//! validated token addresses. Every value is owned by the computation that
//! produced it.

pub mod candle;
pub mod token;
pub mod trade;

pub use candle::{resample, resolution, simple_returns, Candle, PriceSeries};
pub use token::{TokenAddress, TokenAddressError, SOL_MINT, USDC_MINT};
pub use trade::{ExitReason, PositionSide, Trade, TradeAction};
