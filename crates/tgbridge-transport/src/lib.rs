//! # tgbridge Transport
//!
//! Telegram Bot API transport for the tgbridge bot bridge.
//!
//! This crate implements the [`Transport`](tgbridge_core::Transport) /
//! [`TransportDriver`](tgbridge_core::TransportDriver) pair defined in
//! `tgbridge-core`.
//!
//! ## Features
//!
//! - `http-client` (default): long-polling HTTPS client built on `reqwest`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Application        │  (handlers, replies)
//! ├─────────────────────┤
//! │  tgbridge-core      │  (registry, correlator, transport traits)
//! ├─────────────────────┤
//! │  tgbridge-transport │  <- This crate
//! ├─────────────────────┤
//! │  Bot API (HTTPS)    │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tgbridge_transport::{HttpTransportConfig, http_transport};
//!
//! let (transport, driver) = http_transport(HttpTransportConfig::new(token))?;
//! let bridge = Bridge::new(Arc::new(transport));
//! tokio::spawn(Box::new(driver).run(events_tx, shutdown.clone()));
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::{DEFAULT_SERVER, HttpTransportConfig};
pub use error::{TransportError, TransportResult};

#[cfg(feature = "http-client")]
pub use http::{HttpDriver, HttpTransport, http_transport};
