//! Configuration module for the tgbridge runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the Telegram bot and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BridgeConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig, TelegramConfig,
};
pub use validation::validate_config;
