//! Market data port

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{PriceSeries, TokenAddress, TokenAddressError};

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data parsing error: {0}")]
    Parse(String),

    #[error("No data for token {0}")]
    UnknownToken(String),

    #[error("Invalid token address: {0}")]
    InvalidAddress(#[from] TokenAddressError),

    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),
}

impl From<serde_json::Error> for MarketDataError {
    fn from(err: serde_json::Error) -> Self {
        MarketDataError::Parse(err.to_string())
    }
}

/// Candle width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl CandleInterval {
    pub const ALL: [CandleInterval; 6] = [
        CandleInterval::OneMinute,
        CandleInterval::FiveMinutes,
        CandleInterval::FifteenMinutes,
        CandleInterval::OneHour,
        CandleInterval::FourHours,
        CandleInterval::OneDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::FifteenMinutes => "15m",
            CandleInterval::OneHour => "1h",
            CandleInterval::FourHours => "4h",
            CandleInterval::OneDay => "1d",
        }
    }

    pub fn as_millis(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            CandleInterval::OneMinute => MINUTE,
            CandleInterval::FiveMinutes => 5 * MINUTE,
            CandleInterval::FifteenMinutes => 15 * MINUTE,
            CandleInterval::OneHour => 60 * MINUTE,
            CandleInterval::FourHours => 240 * MINUTE,
            CandleInterval::OneDay => 1_440 * MINUTE,
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(CandleInterval::OneMinute),
            "5m" => Ok(CandleInterval::FiveMinutes),
            "15m" => Ok(CandleInterval::FifteenMinutes),
            "1h" => Ok(CandleInterval::OneHour),
            "4h" => Ok(CandleInterval::FourHours),
            "1d" => Ok(CandleInterval::OneDay),
            other => Err(MarketDataError::UnsupportedInterval(other.to_string())),
        }
    }
}

/// Rolling 24h activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    pub volume_24h: f64,
    /// Percent change against the previous 24h
    pub volume_change: f64,
    pub trades_24h: u64,
}

/// Market data port trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Chronologically ascending candles, at most `limit` of the most recent.
    /// An empty series means "no data" and is not an error.
    async fn fetch_candles(
        &self,
        token: &TokenAddress,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<PriceSeries, MarketDataError>;

    /// Latest price
    async fn fetch_current_price(&self, token: &TokenAddress) -> Result<f64, MarketDataError>;

    /// 24h volume statistics
    async fn fetch_volume_24h(&self, token: &TokenAddress) -> Result<VolumeStats, MarketDataError>;
}
