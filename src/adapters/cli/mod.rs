//! CLI Adapter
//!
//! Command-line interface for the scanner.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    read_prices, AnalyzeCmd, BacktestCmd, CliApp, Command, StatsCmd, StrategyKind,
};

use anyhow::Result;

/// Parse the process arguments
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
