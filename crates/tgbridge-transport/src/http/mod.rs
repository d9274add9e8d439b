//! Telegram Bot API over HTTPS long polling.

#[cfg(feature = "http-client")]
mod client;
pub mod convert;

#[cfg(feature = "http-client")]
pub use client::{HttpDriver, HttpTransport, http_transport};
