//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, load_config_or_default, CacheSection, Config, ConfigError, DataSection,
    LoggingSection, MacdSection, DATA_DIR_ENV,
};
