//! Application Layer - Use cases over the indicator engines

pub mod scanner;

pub use scanner::{
    signal_strength, AnalysisMode, Alert, ScanError, ScannerService, ScannerSettings, SignalBias,
    TimeframeSignal, TokenReport, DEFAULT_ADAPTIVE_VOLATILITY,
};
