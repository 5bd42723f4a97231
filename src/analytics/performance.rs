//! Performance metrics for a finished backtest run

use serde::{Deserialize, Serialize};

use super::distribution::{mean, std_dev};
use super::statistics::{StatisticalAnalyzer, StatisticsParams};
use crate::domain::candle::simple_returns;
use crate::domain::Trade;

/// Aggregate over the closed trades and equity curve of one run.
///
/// Percent fields are percent of the quantity named; trade-level averages
/// use each trade's `pnl_percent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// `+inf` with no losing returns
    #[serde(with = "super::unbounded")]
    pub sortino_ratio: f64,
    pub volatility: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub kelly_criterion: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_win: f64,
    pub max_loss: f64,
    pub calmar_ratio: f64,
    pub closed_trades: usize,
}

impl PerformanceMetrics {
    /// Derive every metric from the trade log and equity curve
    pub fn calculate(
        trades: &[Trade],
        equity: &[f64],
        initial_capital: f64,
        params: &StatisticsParams,
    ) -> Self {
        let closed: Vec<&Trade> = trades.iter().filter(|t| !t.is_open).collect();
        let wins: Vec<f64> = closed
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl_percent.unwrap_or(0.0))
            .collect();
        let losses: Vec<f64> = closed
            .iter()
            .filter(|t| t.is_loser())
            .map(|t| t.pnl_percent.unwrap_or(0.0))
            .collect();

        let final_equity = equity.last().copied().unwrap_or(initial_capital);
        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };
        let annualized_return = if equity.is_empty() {
            0.0
        } else {
            total_return * (params.periods_per_year / equity.len() as f64)
        };

        let returns = simple_returns(equity);

        let win_rate = if closed.is_empty() {
            0.0
        } else {
            wins.len() as f64 / closed.len() as f64 * 100.0
        };
        let avg_win = mean(&wins);
        let avg_loss = mean(&losses).abs();
        let profit_factor = if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 };

        let max_drawdown = StatisticalAnalyzer::max_drawdown(equity);
        let calmar_ratio = if max_drawdown > 0.0 { total_return / max_drawdown } else { 0.0 };

        Self {
            total_return,
            annualized_return,
            max_drawdown,
            sharpe_ratio: StatisticalAnalyzer::sharpe_ratio(
                &returns,
                params.risk_free_rate,
                params.periods_per_year,
            ),
            sortino_ratio: StatisticalAnalyzer::sortino_ratio(
                &returns,
                params.risk_free_rate,
                params.periods_per_year,
            ),
            volatility: std_dev(&returns) * 100.0,
            var_95: StatisticalAnalyzer::value_at_risk(&returns, 0.95),
            var_99: StatisticalAnalyzer::value_at_risk(&returns, 0.99),
            cvar_95: StatisticalAnalyzer::conditional_var(&returns, 0.95),
            win_rate,
            profit_factor,
            kelly_criterion: StatisticalAnalyzer::kelly_criterion(win_rate / 100.0, avg_win, avg_loss),
            avg_win,
            avg_loss,
            max_win: wins.iter().copied().fold(0.0, f64::max),
            max_loss: losses.iter().copied().fold(0.0, f64::min).abs(),
            calmar_ratio,
            closed_trades: closed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, PositionSide};
    use approx::assert_relative_eq;

    fn closed_trade(entry: f64, exit: f64) -> Trade {
        let mut trade = Trade::open(0, entry, PositionSide::Long, 1.0);
        trade.close(1, exit, exit - entry, ExitReason::Signal);
        trade
    }

    #[test]
    fn test_empty_run() {
        let metrics = PerformanceMetrics::calculate(&[], &[1000.0], 1000.0, &Default::default());
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.closed_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn test_trade_statistics() {
        let trades = vec![
            closed_trade(100.0, 110.0),
            closed_trade(100.0, 120.0),
            closed_trade(100.0, 95.0),
            Trade::open(2, 100.0, PositionSide::Long, 1.0),
        ];
        let equity = [1000.0, 1010.0, 1030.0, 1025.0];

        let metrics = PerformanceMetrics::calculate(&trades, &equity, 1000.0, &Default::default());

        assert_eq!(metrics.closed_trades, 3);
        assert_relative_eq!(metrics.win_rate, 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_win, 15.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_loss, 5.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.profit_factor, 3.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.max_win, 20.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.max_loss, 5.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.total_return, 2.5, epsilon = 1e-9);
        assert_relative_eq!(metrics.annualized_return, 2.5 * 252.0 / 4.0, epsilon = 1e-9);
        assert!((0.0..=25.0).contains(&metrics.kelly_criterion));
        assert!(metrics.max_drawdown > 0.0);
        assert_relative_eq!(
            metrics.calmar_ratio,
            metrics.total_return / metrics.max_drawdown,
            epsilon = 1e-9
        );
    }
}
