//! Foundation layer - records, descriptors and event numbering.
//!
//! This module contains the building blocks every other layer relies on:
//! - Descriptor-driven decoding of native records into JSON objects
//! - Typed update and response records
//! - Lifecycle event identifiers and the event bus
//! - Error taxonomy and opaque user data

pub mod descriptor;
pub mod error;
pub mod event;
pub mod record;
pub mod user_data;

pub use descriptor::{
    Descriptor, FieldDescriptor, FieldKind, NativeRecord, NativeValue, RawRecord, decode,
};
pub use error::{
    DecodeError, HandlerError, HandlerResult, ParseError, ParseResult, PayloadParseError,
    SubmissionError, SubmitResult, SubscribeError,
};
pub use event::{EventBus, EventId, LifecycleEvent, allocate_event_base};
pub use record::{
    RESPONSE_DESCRIPTOR, ResponseRecord, UNSUPPORTED_TEXT, UPDATE_DESCRIPTOR, UpdateKind,
    UpdateRecord, parse_response, parse_update,
};
pub use user_data::UserData;
