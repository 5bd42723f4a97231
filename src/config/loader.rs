//! Configuration Loader
//!
//! Loads and validates scanner configuration from TOML files. Every section
//! is optional and falls back to the engine defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::analytics::{BacktestConfig, StatisticsParams};
use crate::application::{AnalysisMode, ScannerSettings, DEFAULT_ADAPTIVE_VOLATILITY};
use crate::ports::CandleInterval;
use crate::strategy::{DivergenceParams, MacdParams, RegimeParams};

/// Overrides `[data].candles_dir`
pub const DATA_DIR_ENV: &str = "MACD_SCANNER_DATA_DIR";

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub macd: MacdSection,
    pub regime: RegimeParams,
    pub divergence: DivergenceParams,
    pub statistics: StatisticsParams,
    pub backtest: BacktestConfig,
    pub cache: CacheSection,
    pub data: DataSection,
    pub logging: LoggingSection,
}

/// MACD configuration section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdSection {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    /// Volatility fed to the adaptive period scaling
    pub adaptive_volatility: f64,
    /// "standard" or "adaptive"
    pub mode: AnalysisMode,
}

impl Default for MacdSection {
    fn default() -> Self {
        let params = MacdParams::default();
        Self {
            fast_period: params.fast_period,
            slow_period: params.slow_period,
            signal_period: params.signal_period,
            adaptive_volatility: DEFAULT_ADAPTIVE_VOLATILITY,
            mode: AnalysisMode::Standard,
        }
    }
}

/// Market data cache TTLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub price_ttl_secs: u64,
    pub candle_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            price_ttl_secs: 60,
            candle_ttl_secs: 300,
        }
    }
}

impl CacheSection {
    pub fn price_ttl(&self) -> Duration {
        Duration::from_secs(self.price_ttl_secs)
    }

    pub fn candle_ttl(&self) -> Duration {
        Duration::from_secs(self.candle_ttl_secs)
    }
}

/// Candle source configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory holding `<mint>.json` candle files (`~` allowed)
    pub candles_dir: String,
    pub interval: CandleInterval,
    /// Candles requested per analysis
    pub limit: usize,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            candles_dir: "data/candles".to_string(),
            interval: CandleInterval::OneHour,
            limit: 200,
        }
    }
}

impl DataSection {
    /// Candle directory with `~` and `$VAR` expanded
    pub fn candles_path(&self) -> PathBuf {
        match shellexpand::full(&self.candles_dir) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(&self.candles_dir).as_ref()),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file, then apply environment overrides
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_overrides(std::env::var(DATA_DIR_ENV).ok());
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise the built-in defaults
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    if path.as_ref().exists() {
        return load_config(path);
    }
    tracing::debug!(path = %path.as_ref().display(), "Config file not found, using defaults");
    let mut config = Config::default();
    config.apply_overrides(std::env::var(DATA_DIR_ENV).ok());
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn apply_overrides(&mut self, data_dir: Option<String>) {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data.candles_dir = dir;
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        MacdParams::from(self).validate().map_err(invalid)?;
        self.regime.validate().map_err(invalid)?;
        self.divergence.validate().map_err(invalid)?;
        self.statistics.validate().map_err(invalid)?;
        self.backtest.validate().map_err(invalid)?;

        if !(self.macd.adaptive_volatility.is_finite() && self.macd.adaptive_volatility >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "adaptive_volatility must be >= 0, got {}",
                self.macd.adaptive_volatility
            )));
        }

        if self.data.limit == 0 {
            return Err(ConfigError::ValidationError(
                "data.limit must be > 0".to_string(),
            ));
        }

        if self.data.candles_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "candles_dir cannot be empty".to_string(),
            ));
        }

        if self.cache.price_ttl_secs == 0 || self.cache.candle_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache TTLs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(err: impl std::fmt::Display) -> ConfigError {
    ConfigError::ValidationError(err.to_string())
}

impl From<&Config> for MacdParams {
    fn from(config: &Config) -> Self {
        MacdParams::new(
            config.macd.fast_period,
            config.macd.slow_period,
            config.macd.signal_period,
        )
    }
}

impl From<&Config> for RegimeParams {
    fn from(config: &Config) -> Self {
        config.regime
    }
}

impl From<&Config> for StatisticsParams {
    fn from(config: &Config) -> Self {
        config.statistics
    }
}

impl From<&Config> for BacktestConfig {
    fn from(config: &Config) -> Self {
        config.backtest
    }
}

impl From<&Config> for ScannerSettings {
    fn from(config: &Config) -> Self {
        ScannerSettings {
            macd: MacdParams::from(config),
            regime: RegimeParams::from(config),
            divergence: config.divergence,
            statistics: StatisticsParams::from(config),
            backtest: BacktestConfig::from(config),
            adaptive_volatility: config.macd.adaptive_volatility,
            mode: config.macd.mode,
        }
    }
}
