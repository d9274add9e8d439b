//! Error taxonomy of the bridge core.
//!
//! Decode-side failures ([`DecodeError`], [`PayloadParseError`]) surface to
//! whichever call triggered decoding. [`SubmissionError`] is returned
//! synchronously by outbound calls. [`HandlerError`] never leaves the
//! subscription registry: it is reported and dispatch carries on.

use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// A native record could not be decoded against its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record handle was released by the transport before decoding.
    #[error("record handle for '{descriptor}' is invalid or expired")]
    InvalidHandle {
        /// Descriptor the record was decoded against.
        descriptor: &'static str,
    },

    /// A non-nullable field is absent or null.
    #[error("field '{field}' of '{descriptor}' is missing")]
    MissingField {
        /// Descriptor the record was decoded against.
        descriptor: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The record holds a representation other than the declared one.
    #[error("field '{field}' of '{descriptor}' expected {expected}, found {found}")]
    TypeMismatch {
        /// Descriptor the record was decoded against.
        descriptor: &'static str,
        /// Name of the offending field.
        field: &'static str,
        /// Type declared by the descriptor.
        expected: &'static str,
        /// Type found in the record.
        found: &'static str,
    },

    /// The decoded object does not fit the typed record shape.
    #[error("'{descriptor}' does not fit its record shape: {reason}")]
    Schema {
        /// Descriptor the record was decoded against.
        descriptor: &'static str,
        /// Reason reported by the typed conversion.
        reason: String,
    },
}

/// A field documented as embedded JSON text did not parse.
///
/// The raw text is kept for diagnostics.
#[derive(Debug, Error)]
#[error("field '{field}' carries a malformed JSON payload: {source}")]
pub struct PayloadParseError {
    /// Name of the field holding the payload.
    pub field: &'static str,
    /// The raw, unparsed text.
    pub raw: String,
    /// Underlying parser error.
    #[source]
    pub source: serde_json::Error,
}

/// Any failure raised while turning a native record into a structured value.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Invalid handle or schema mismatch.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Embedded JSON did not parse.
    #[error(transparent)]
    Payload(#[from] PayloadParseError),
}

// =============================================================================
// Submission Errors
// =============================================================================

/// An outbound call was rejected before it reached the transport.
///
/// A rejected call never invokes its completion.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// An argument failed validation.
    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The payload could not be turned into JSON text.
    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport cannot accept calls right now.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The transport's outbound queue is at capacity.
    #[error("outbound queue is full ({capacity} calls pending)")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
}

impl SubmissionError {
    /// Creates an invalid argument error.
    pub fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Handler / Subscription Errors
// =============================================================================

/// An application handler failed while processing an update.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(#[source] Box<dyn StdError + Send + Sync>),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wraps any error (or message) raised by a handler.
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Failed(err.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

impl From<SubmissionError> for HandlerError {
    fn from(err: SubmissionError) -> Self {
        Self::new(err)
    }
}

/// Errors returned by `subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// Patterns must contain at least one character.
    #[error("subscription pattern must not be empty")]
    EmptyPattern,
}

/// Extracts a printable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding native records.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for outbound submissions.
pub type SubmitResult<T> = Result<T, SubmissionError>;

/// Result type returned by update handlers.
pub type HandlerResult = Result<(), HandlerError>;
