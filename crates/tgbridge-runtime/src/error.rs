//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use tgbridge_transport::TransportError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport could not be created.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Registering the shutdown signal handlers failed.
    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
