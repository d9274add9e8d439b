//! tgbridge Runtime - Orchestration layer for the tgbridge bot bridge.
//!
//! This crate provides:
//! - Configuration loading (`ConfigLoader`, `BridgeConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - The event loop driving a transport (`BridgeRuntime`)
//! - Chat access filtering (`AccessList`)
//!
//! ```ignore
//! use tgbridge_runtime::BridgeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BridgeRuntime::builder().build()?;
//!
//!     runtime.bridge().subscribe("/start", |update, _| {
//!         tracing::info!(chat_id = update.chat_id, "start");
//!         Ok(())
//!     }, Default::default())?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Transport
//!
//! With the default `http-client` feature the runtime long-polls the Bot API.
//! [`BridgeRuntime::with_transport`] accepts any other
//! [`Transport`](tgbridge_core::Transport) implementation.

pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    BridgeConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile, TelegramConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use filter::AccessList;
pub use logging::{LoggingBuilder, fmt_span};
pub use runtime::{BridgeRuntime, EventOutcome, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
