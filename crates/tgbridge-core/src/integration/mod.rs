//! Integration layer - transport boundary and outbound calls.
//!
//! This module contains the interfaces towards the bot transport:
//! - The [`Transport`] / [`TransportDriver`] pair implemented by transports
//! - The outbound call [`Correlator`] tying completions to responses

pub mod correlator;
pub mod transport;

pub use correlator::{Completion, Correlator, OutboundCall, methods};
pub use transport::{OutboundRequest, PendingCall, Transport, TransportDriver, TransportEvent};
