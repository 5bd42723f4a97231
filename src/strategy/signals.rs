//! Trading strategies driven by MACD results
//!
//! A strategy sees the MACD of the price prefix up to the current candle and
//! that candle's close, and answers BUY / SELL / HOLD. Any
//! `FnMut(&MacdResult, f64) -> TradeAction` closure is a strategy.

use crate::domain::TradeAction;

use super::macd::{Crossover, MacdCalculator, MacdResult};

/// Decision function evaluated once per candle
pub trait Strategy {
    fn decide(&mut self, macd: &MacdResult, price: f64) -> TradeAction;

    /// Short name for logs and reports
    fn name(&self) -> &str {
        "custom"
    }

    /// Forget any state carried between candles
    fn reset(&mut self) {}
}

impl<F> Strategy for F
where
    F: FnMut(&MacdResult, f64) -> TradeAction,
{
    fn decide(&mut self, macd: &MacdResult, price: f64) -> TradeAction {
        self(macd, price)
    }
}

/// Buys on a bullish signal-line crossover, sells on a bearish one
#[derive(Debug, Clone, Default)]
pub struct MacdCrossoverStrategy {
    /// Minimum composite signal strength to act on (0-100)
    min_strength: f64,
    previous: Option<MacdResult>,
}

impl MacdCrossoverStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_strength(mut self, min_strength: f64) -> Self {
        self.min_strength = min_strength;
        self
    }
}

impl Strategy for MacdCrossoverStrategy {
    fn decide(&mut self, macd: &MacdResult, _price: f64) -> TradeAction {
        if macd.is_empty() {
            return TradeAction::Hold;
        }

        let Some(previous) = self.previous.replace(macd.clone()) else {
            return TradeAction::Hold;
        };

        if MacdCalculator::validate_signal_strength(macd) < self.min_strength {
            return TradeAction::Hold;
        }

        match MacdCalculator::detect_crossover(macd, &previous) {
            Crossover::Bullish => TradeAction::Buy,
            Crossover::Bearish => TradeAction::Sell,
            Crossover::None => TradeAction::Hold,
        }
    }

    fn name(&self) -> &str {
        "macd_crossover"
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}

/// Always asks to buy; the engine only acts on it while flat
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHoldStrategy;

impl Strategy for BuyAndHoldStrategy {
    fn decide(&mut self, _macd: &MacdResult, _price: f64) -> TradeAction {
        TradeAction::Buy
    }

    fn name(&self) -> &str {
        "buy_and_hold"
    }
}
