//! # tgbridge Core
//!
//! The dispatch and descriptor-marshalling core of the tgbridge Telegram bot
//! bridge.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Descriptor Decoder**: turns a borrowed [`NativeRecord`] plus a
//!   [`Descriptor`] into a JSON object ([`decode`])
//! - **Records**: typed [`UpdateRecord`] / [`ResponseRecord`] views
//! - **Events**: lifecycle identifiers ([`LifecycleEvent`]) and the [`EventBus`]
//!
//! ### Framework Layer
//!
//! - **Subscription Registry**: pattern matching and handler dispatch
//!   ([`SubscriptionRegistry`])
//!
//! ### Integration Layer
//!
//! - **Transport boundary**: [`Transport`], [`TransportDriver`], [`TransportEvent`]
//! - **Outbound Call Correlator**: verbs with optional completions ([`Correlator`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────┐  record   ┌─────────┐  UpdateRecord  ┌──────────┐
//! │ Transport │──────────▶│ decode  │───────────────▶│ Registry │──▶ handlers
//! └───────────┘           └─────────┘                └──────────┘
//!       ▲                                                  │
//!       │           OutboundRequest ┌────────────┐         │
//!       └───────────────────────────│ Correlator │◀────────┘
//!                                   └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tgbridge_core::{Bridge, RawRecord, UserData};
//!
//! let bridge = Bridge::new(transport);
//! bridge.subscribe("/start", |update, _| {
//!     println!("start from {}", update.chat_id);
//!     Ok(())
//! }, UserData::none())?;
//!
//! let record = RawRecord::new()
//!     .with("kind", "message")
//!     .with("chat_id", 42_i64)
//!     .with("text", "/start");
//! bridge.dispatch_record(&record)?;
//! ```

// Architectural layers
pub mod bridge;
pub mod foundation;
pub mod framework;
pub mod integration;

pub use bridge::Bridge;

// Re-export foundation types
pub use foundation::{
    DecodeError, Descriptor, EventBus, EventId, FieldDescriptor, FieldKind, HandlerError,
    HandlerResult, LifecycleEvent, NativeRecord, NativeValue, ParseError, ParseResult,
    PayloadParseError, RESPONSE_DESCRIPTOR, RawRecord, ResponseRecord, SubmissionError,
    SubmitResult, SubscribeError, UNSUPPORTED_TEXT, UPDATE_DESCRIPTOR, UpdateKind, UpdateRecord,
    UserData, allocate_event_base, decode, parse_response, parse_update,
};

// Re-export framework types
pub use framework::{
    DispatchOutcome, Pattern, Subscription, SubscriptionHandle, SubscriptionRegistry,
    UpdateHandler, WILDCARD, noop_handler,
};

// Re-export integration types
pub use integration::{
    Completion, Correlator, OutboundCall, OutboundRequest, PendingCall, Transport,
    TransportDriver, TransportEvent, methods,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bridge::Bridge;
    pub use super::foundation::*;
    pub use super::framework::{SubscriptionHandle, SubscriptionRegistry, UpdateHandler};
    pub use super::integration::{Correlator, Transport};
}
