//! Errors raised while loading or checking `tgbridge` settings.

use std::path::PathBuf;

use thiserror::Error;

/// A configuration problem.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// No enabled format feature handles this extension.
    #[error("no enabled config format handles `.{0}` files")]
    UnsupportedFormat(String),

    /// Merged sources do not fit [`BridgeConfig`](super::BridgeConfig).
    #[error("cannot read configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// A setting is required but empty.
    #[error("`{0}` must be set")]
    MissingField(&'static str),

    /// A setting holds a value out of range.
    #[error("`{field}` {reason}")]
    OutOfRange {
        /// Dotted key, e.g. `telegram.rx_queue_len`.
        field: &'static str,
        /// Constraint the value broke.
        reason: &'static str,
    },

    /// The Bot API server address is unusable.
    #[error("bad server url `{url}`: {reason}")]
    InvalidUrl {
        /// Address as configured.
        url: String,
        /// Constraint the address broke.
        reason: &'static str,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// Result alias for configuration work.
pub type ConfigResult<T> = Result<T, ConfigError>;
