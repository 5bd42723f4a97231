//! Indicator Parameters
//!
//! Configuration structs for the MACD, regime and divergence engines.
//! Defaults are the classic 12/26/9 MACD and the 20/50 EMA regime split.

use serde::{Deserialize, Serialize};

/// MACD periods
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    /// Fast EMA period
    pub fast_period: usize,
    /// Slow EMA period
    pub slow_period: usize,
    /// Signal line EMA period
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl MacdParams {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self { fast_period, slow_period, signal_period }
    }

    /// Minimum number of prices before a MACD result carries any history
    pub fn min_prices(&self) -> usize {
        self.slow_period + self.signal_period
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_period == 0 || self.slow_period == 0 || self.signal_period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.fast_period >= self.slow_period {
            return Err(ConfigError::FastNotBelowSlow(self.fast_period, self.slow_period));
        }
        Ok(())
    }
}

/// Which regime classifier the scanner reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeMethod {
    /// Price vs EMA20 vs EMA50 ordering
    #[default]
    EmaTrend,
    /// Ternary-observation scoring over recent returns
    Hmm,
}

/// Regime detector settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    pub method: RegimeMethod,
    /// Minimum prices before a regime is classified
    pub min_prices: usize,
    /// Short trend EMA period
    pub short_period: usize,
    /// Long trend EMA period
    pub long_period: usize,
    /// Per-candle return volatility above which confidence is damped
    pub high_volatility: f64,
    /// Confidence multiplier applied in high volatility
    pub volatility_damping: f64,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            method: RegimeMethod::EmaTrend,
            min_prices: 50,
            short_period: 20,
            long_period: 50,
            high_volatility: 0.03,
            volatility_damping: 0.8,
        }
    }
}

impl RegimeParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_period == 0 || self.long_period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.short_period >= self.long_period {
            return Err(ConfigError::FastNotBelowSlow(self.short_period, self.long_period));
        }
        if self.min_prices < self.long_period {
            return Err(ConfigError::InvalidRegimeWindow(self.min_prices, self.long_period));
        }
        if !(0.0..=1.0).contains(&self.volatility_damping) {
            return Err(ConfigError::InvalidDamping(self.volatility_damping));
        }
        Ok(())
    }
}

/// Divergence detector settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceParams {
    /// Minimum points in both price and MACD history
    pub min_points: usize,
    /// Minimum |Δmacd - Δprice| (as a fraction) to report a divergence
    pub threshold: f64,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            min_points: 20,
            threshold: 0.1,
        }
    }
}

impl DivergenceParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_points < 3 {
            return Err(ConfigError::InvalidDivergenceWindow(self.min_points));
        }
        if self.threshold < 0.0 || !self.threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Indicator periods must be greater than zero")]
    ZeroPeriod,
    #[error("Fast period {0} must be below slow period {1}")]
    FastNotBelowSlow(usize, usize),
    #[error("Regime min_prices {0} is shorter than the long EMA period {1}")]
    InvalidRegimeWindow(usize, usize),
    #[error("Invalid volatility damping: {0} (must be 0-1)")]
    InvalidDamping(f64),
    #[error("Invalid divergence window: {0} (minimum 3)")]
    InvalidDivergenceWindow(usize),
    #[error("Invalid divergence threshold: {0}")]
    InvalidThreshold(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_macd_params() {
        let params = MacdParams::default();
        assert_eq!(params.fast_period, 12);
        assert_eq!(params.slow_period, 26);
        assert_eq!(params.signal_period, 9);
        assert_eq!(params.min_prices(), 35);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_macd_params() {
        assert_eq!(MacdParams::new(0, 26, 9).validate(), Err(ConfigError::ZeroPeriod));
        assert_eq!(
            MacdParams::new(26, 12, 9).validate(),
            Err(ConfigError::FastNotBelowSlow(26, 12))
        );
    }

    #[test]
    fn test_regime_params_validation() {
        let mut params = RegimeParams::default();
        assert!(params.validate().is_ok());

        params.min_prices = 30;
        assert!(matches!(params.validate(), Err(ConfigError::InvalidRegimeWindow(30, 50))));

        let mut params = RegimeParams::default();
        params.volatility_damping = 1.5;
        assert!(matches!(params.validate(), Err(ConfigError::InvalidDamping(_))));
    }

    #[test]
    fn test_divergence_params_validation() {
        let mut params = DivergenceParams::default();
        assert!(params.validate().is_ok());

        params.threshold = -0.5;
        assert!(params.validate().is_err());

        params.threshold = 0.1;
        params.min_points = 2;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let params: MacdParams = toml::from_str("fast_period = 8").unwrap();
        assert_eq!(params.fast_period, 8);
        assert_eq!(params.slow_period, 26);
    }
}
