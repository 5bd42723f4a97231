//! Analytics Layer
//!
//! Risk statistics, correlation analysis and strategy backtesting.

pub mod backtest;
pub mod correlation;
pub mod distribution;
pub mod performance;
pub mod statistics;
pub mod unbounded;

pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, WalkForwardReport,
    DEFAULT_WALK_FORWARD_STEP, DEFAULT_WALK_FORWARD_WINDOW, DEFAULT_WARMUP,
};
pub use correlation::{
    CorrelationAnalyzer, CorrelationMatrix, CorrelationRegime, CorrelationRegimeChange,
};
pub use distribution::DistributionStats;
pub use performance::PerformanceMetrics;
pub use statistics::{StatisticalAnalyzer, StatisticalMetrics, StatisticsParams, StatsError};
