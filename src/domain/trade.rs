use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a simulated position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// Decision returned by a strategy for one candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// Why an open trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

/// A simulated trade.
///
/// Created on an entry signal, closed exactly once (signal, stop, take-profit
/// or end of data) and never reopened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub position: PositionSide,
    pub size: f64,
    pub pnl: Option<f64>,
    pub pnl_percent: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub is_open: bool,
}

impl Trade {
    /// Open a new trade
    pub fn open(entry_time: i64, entry_price: f64, position: PositionSide, size: f64) -> Self {
        Self {
            entry_time,
            exit_time: None,
            entry_price,
            exit_price: None,
            position,
            size,
            pnl: None,
            pnl_percent: None,
            exit_reason: None,
            is_open: true,
        }
    }

    /// Notional value at entry
    pub fn notional(&self) -> f64 {
        self.entry_price * self.size
    }

    /// Gross PnL if the trade were closed at `price`
    pub fn gross_pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.position.sign()
    }

    /// Fractional move from entry in the trade's favour
    pub fn return_at(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * self.position.sign()
    }

    /// Close the trade. Closing an already closed trade is a no-op.
    pub fn close(&mut self, exit_time: i64, exit_price: f64, pnl: f64, reason: ExitReason) {
        if !self.is_open {
            return;
        }
        let notional = self.notional();
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.pnl = Some(pnl);
        self.pnl_percent = Some(if notional != 0.0 { pnl / notional * 100.0 } else { 0.0 });
        self.exit_reason = Some(reason);
        self.is_open = false;
    }

    pub fn is_winner(&self) -> bool {
        self.pnl.map_or(false, |p| p > 0.0)
    }

    pub fn is_loser(&self) -> bool {
        self.pnl.map_or(false, |p| p < 0.0)
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_price, self.pnl) {
            (Some(exit), Some(pnl)) => write!(
                f,
                "{} {:.4} @ {:.6} -> {:.6} (pnl {:.4})",
                self.position, self.size, self.entry_price, exit, pnl
            ),
            _ => write!(
                f,
                "{} {:.4} @ {:.6} (open)",
                self.position, self.size, self.entry_price
            ),
        }
    }
}
