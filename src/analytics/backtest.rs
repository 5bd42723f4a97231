//! Backtest Engine
//!
//! Replays candles through a `Strategy`. From the warm-up index onward each
//! candle recomputes MACD over the price prefix, asks the strategy for an
//! action and manages at most one open position:
//!
//! - BUY while flat opens LONG (SELL opens SHORT when shorting is enabled)
//! - the opposite action closes the position
//! - stop-loss / take-profit force an exit independent of signals
//! - a position still open after the last candle is closed at the last close
//!
//! Entry commission is charged immediately; exit commission is netted into
//! the trade's PnL. Equity is realised capital, one point per processed
//! candle after the initial capital.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::performance::PerformanceMetrics;
use super::statistics::StatisticsParams;
use crate::domain::{Candle, ExitReason, PositionSide, Trade, TradeAction};
use crate::strategy::{MacdCalculator, MacdParams, Strategy};

pub const DEFAULT_WARMUP: usize = 30;
pub const DEFAULT_WALK_FORWARD_WINDOW: usize = 100;
pub const DEFAULT_WALK_FORWARD_STEP: usize = 20;

/// Invalid backtest configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("Initial capital must be positive, got {0}")]
    InvalidCapital(f64),
    #[error("Position size must be in (0, 1], got {0}")]
    InvalidPositionSize(f64),
    #[error("Commission must be non-negative, got {0}")]
    InvalidCommission(f64),
    #[error("Slippage must be in [0, 1), got {0}")]
    InvalidSlippage(f64),
    #[error("Stop loss must be in (0, 1), got {0}")]
    InvalidStopLoss(f64),
    #[error("Take profit must be in (0, 1), got {0}")]
    InvalidTakeProfit(f64),
    #[error("Walk-forward window and step must be positive (window {window}, step {step})")]
    InvalidWalkForward { window: usize, step: usize },
}

/// Simulation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of current capital committed per entry
    pub position_size: f64,
    /// Fractional adverse move that forces an exit
    pub stop_loss: Option<f64>,
    /// Fractional favourable move that forces an exit
    pub take_profit: Option<f64>,
    /// Fraction of notional charged per fill
    pub commission: f64,
    /// Fractional price penalty per fill
    pub slippage: f64,
    pub allow_short: bool,
    /// Candles skipped before the strategy is consulted
    pub warmup: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            position_size: 0.1,
            stop_loss: Some(0.05),
            take_profit: None,
            commission: 0.001,
            slippage: 0.001,
            allow_short: false,
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl BacktestConfig {
    pub fn with_capital(mut self, capital: f64) -> Self {
        self.initial_capital = capital;
        self
    }

    pub fn with_position_size(mut self, size: f64) -> Self {
        self.position_size = size;
        self
    }

    pub fn with_stop_loss(mut self, stop_loss: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self
    }

    pub fn with_take_profit(mut self, take_profit: Option<f64>) -> Self {
        self.take_profit = take_profit;
        self
    }

    pub fn with_costs(mut self, commission: f64, slippage: f64) -> Self {
        self.commission = commission;
        self.slippage = slippage;
        self
    }

    pub fn with_shorting(mut self, allow_short: bool) -> Self {
        self.allow_short = allow_short;
        self
    }

    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    /// Frictionless config: no costs, no stops
    pub fn frictionless(initial_capital: f64, position_size: f64) -> Self {
        Self {
            initial_capital,
            position_size,
            stop_loss: None,
            take_profit: None,
            commission: 0.0,
            slippage: 0.0,
            allow_short: false,
            warmup: DEFAULT_WARMUP,
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(BacktestError::InvalidCapital(self.initial_capital));
        }
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(BacktestError::InvalidPositionSize(self.position_size));
        }
        if !(self.commission >= 0.0 && self.commission.is_finite()) {
            return Err(BacktestError::InvalidCommission(self.commission));
        }
        if !(self.slippage >= 0.0 && self.slippage < 1.0) {
            return Err(BacktestError::InvalidSlippage(self.slippage));
        }
        if let Some(sl) = self.stop_loss {
            if !(sl > 0.0 && sl < 1.0) {
                return Err(BacktestError::InvalidStopLoss(sl));
            }
        }
        if let Some(tp) = self.take_profit {
            if !(tp > 0.0 && tp < 1.0) {
                return Err(BacktestError::InvalidTakeProfit(tp));
            }
        }
        Ok(())
    }
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub metrics: PerformanceMetrics,
    pub equity: Vec<f64>,
}

impl BacktestReport {
    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(0.0)
    }
}

/// Metrics of each rolling in-sample / out-of-sample window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkForwardReport {
    pub in_sample: Vec<PerformanceMetrics>,
    pub out_of_sample: Vec<PerformanceMetrics>,
}

impl WalkForwardReport {
    pub fn windows(&self) -> usize {
        self.in_sample.len()
    }
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    macd: MacdCalculator,
    stats: StatisticsParams,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self {
            config,
            macd: MacdCalculator::default(),
            stats: StatisticsParams::default(),
        })
    }

    pub fn with_macd(mut self, params: MacdParams) -> Self {
        self.macd = MacdCalculator::new(params);
        self
    }

    pub fn with_statistics(mut self, params: StatisticsParams) -> Self {
        self.stats = params;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Simulate `strategy` over `candles`
    pub fn run_backtest<S>(&self, candles: &[Candle], strategy: &mut S) -> BacktestReport
    where
        S: Strategy + ?Sized,
    {
        strategy.reset();

        let cfg = &self.config;
        let prices: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let mut trades: Vec<Trade> = Vec::new();
        let mut equity = vec![cfg.initial_capital];
        let mut capital = cfg.initial_capital;
        // index into `trades` of the open position
        let mut open: Option<usize> = None;

        for (i, candle) in candles.iter().enumerate().skip(cfg.warmup) {
            let price = candle.close;
            let macd = self.macd.calculate_at(&prices[..=i], candle.timestamp);
            let action = strategy.decide(&macd, price);

            match (action, open.map(|idx| trades[idx].position)) {
                (TradeAction::Buy, None) => {
                    let (trade, commission) = self.enter(PositionSide::Long, candle, capital);
                    capital -= commission;
                    trades.push(trade);
                    open = Some(trades.len() - 1);
                }
                (TradeAction::Sell, None) if cfg.allow_short => {
                    let (trade, commission) = self.enter(PositionSide::Short, candle, capital);
                    capital -= commission;
                    trades.push(trade);
                    open = Some(trades.len() - 1);
                }
                (TradeAction::Sell, Some(PositionSide::Long))
                | (TradeAction::Buy, Some(PositionSide::Short)) => {
                    if let Some(idx) = open.take() {
                        capital += self.exit_on_signal(&mut trades[idx], candle);
                    }
                }
                _ => {}
            }

            if let Some(idx) = open {
                if let Some(pnl) = self.check_exit_levels(&mut trades[idx], candle) {
                    capital += pnl;
                    open = None;
                }
            }

            equity.push(capital);
        }

        if let (Some(idx), Some(last)) = (open, candles.last()) {
            let trade = &mut trades[idx];
            let pnl = trade.gross_pnl_at(last.close);
            trade.close(last.timestamp, last.close, pnl, ExitReason::EndOfData);
            capital += pnl;
            if let Some(point) = equity.last_mut() {
                *point = capital;
            }
            debug!(%trade, "Closed at end of data");
        }

        let metrics = PerformanceMetrics::calculate(&trades, &equity, cfg.initial_capital, &self.stats);

        info!(
            strategy = strategy.name(),
            candles = candles.len(),
            trades = trades.len(),
            total_return = metrics.total_return,
            "Backtest finished"
        );

        BacktestReport { trades, metrics, equity }
    }

    /// Rolling in-sample / out-of-sample runs of `window` and `step` candles
    pub fn run_walk_forward_analysis<S>(
        &self,
        candles: &[Candle],
        strategy: &mut S,
        window: usize,
        step: usize,
    ) -> Result<WalkForwardReport, BacktestError>
    where
        S: Strategy + ?Sized,
    {
        if window == 0 || step == 0 {
            return Err(BacktestError::InvalidWalkForward { window, step });
        }

        let mut report = WalkForwardReport::default();
        let mut start = 0;
        while start + window + step < candles.len() {
            let in_sample = &candles[start..start + window];
            let out_of_sample = &candles[start + window..start + window + step];

            report.in_sample.push(self.run_backtest(in_sample, strategy).metrics);
            report.out_of_sample.push(self.run_backtest(out_of_sample, strategy).metrics);

            start += step;
        }

        info!(windows = report.windows(), window, step, "Walk-forward analysis finished");
        Ok(report)
    }

    /// New position plus the entry commission to charge
    fn enter(&self, side: PositionSide, candle: &Candle, capital: f64) -> (Trade, f64) {
        let cfg = &self.config;
        let size = capital * cfg.position_size / candle.close;
        // slippage always works against the trader
        let entry_price = candle.close * (1.0 + cfg.slippage * side.sign());
        let commission = size * entry_price * cfg.commission;

        let trade = Trade::open(candle.timestamp, entry_price, side, size);
        debug!(%trade, commission, "Opened position");
        (trade, commission)
    }

    /// Returns realised PnL net of exit commission
    fn exit_on_signal(&self, trade: &mut Trade, candle: &Candle) -> f64 {
        let cfg = &self.config;
        let exit_price = candle.close * (1.0 - cfg.slippage * trade.position.sign());
        let commission = trade.size * exit_price * cfg.commission;
        let pnl = trade.gross_pnl_at(exit_price) - commission;

        trade.close(candle.timestamp, exit_price, pnl, ExitReason::Signal);
        debug!(%trade, "Closed on signal");
        pnl
    }

    /// Stop-loss / take-profit check; returns realised PnL when hit
    fn check_exit_levels(&self, trade: &mut Trade, candle: &Candle) -> Option<f64> {
        let cfg = &self.config;
        let sign = trade.position.sign();
        let move_pct = trade.return_at(candle.close);

        let (exit_price, reason) = match (cfg.stop_loss, cfg.take_profit) {
            (Some(sl), _) if move_pct <= -sl => (trade.entry_price * (1.0 - sl * sign), ExitReason::StopLoss),
            (_, Some(tp)) if move_pct >= tp => (trade.entry_price * (1.0 + tp * sign), ExitReason::TakeProfit),
            _ => return None,
        };

        let pnl = trade.gross_pnl_at(exit_price);
        trade.close(candle.timestamp, exit_price, pnl, reason);
        debug!(%trade, ?reason, "Exit level hit");
        Some(pnl)
    }
}
