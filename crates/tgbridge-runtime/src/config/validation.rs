//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BridgeConfig, TelegramConfig};

/// Validates the entire configuration.
///
/// A disabled bot is not checked further.
pub fn validate_config(config: &BridgeConfig) -> ConfigResult<()> {
    if config.telegram.enable {
        validate_telegram_config(&config.telegram)?;
    }
    Ok(())
}

/// Validates the Telegram settings.
fn validate_telegram_config(telegram: &TelegramConfig) -> ConfigResult<()> {
    if telegram.token.trim().is_empty() {
        return Err(ConfigError::MissingField("telegram.token"));
    }

    validate_url(&telegram.server)?;

    if telegram.rx_queue_len == 0 {
        return Err(ConfigError::OutOfRange {
            field: "telegram.rx_queue_len",
            reason: "must be at least 1",
        });
    }

    if telegram.tx_queue_len == 0 {
        return Err(ConfigError::OutOfRange {
            field: "telegram.tx_queue_len",
            reason: "must be at least 1",
        });
    }

    if telegram.handshake_retry_ms == 0 {
        return Err(ConfigError::OutOfRange {
            field: "telegram.handshake_retry_ms",
            reason: "must be greater than 0",
        });
    }

    Ok(())
}

/// Validates an `http(s)` server URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: "scheme must be http or https",
        })?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host",
        });
    }

    Ok(())
}
