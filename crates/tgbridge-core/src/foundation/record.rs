//! Typed views over decoded update and response records.
//!
//! [`UPDATE_DESCRIPTOR`] and [`RESPONSE_DESCRIPTOR`] describe the two record
//! shapes the transport produces. [`parse_update`] and [`parse_response`] run
//! the descriptor decoder and then map the structured object onto
//! [`UpdateRecord`] / [`ResponseRecord`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::foundation::descriptor::{Descriptor, FieldDescriptor, FieldKind, NativeRecord, decode};
use crate::foundation::error::{DecodeError, ParseError, ParseResult};

/// Text used by transports when a message carries no usable text.
pub const UNSUPPORTED_TEXT: &str = "Unsupported characters, or data type";

// =============================================================================
// Update Kind
// =============================================================================

/// The kinds of inbound updates the bridge routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A chat message.
    Message,
    /// A press on an inline keyboard button.
    CallbackQuery,
}

impl UpdateKind {
    /// Returns the wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::CallbackQuery => "callback_query",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// Layout of an inbound update record.
///
/// For callback queries, `text` carries the button's callback data so that
/// subscriptions can match on it.
pub static UPDATE_DESCRIPTOR: Descriptor = Descriptor::new(
    "update",
    &[
        FieldDescriptor::required("kind", FieldKind::Str),
        FieldDescriptor::required("chat_id", FieldKind::Int),
        FieldDescriptor::nullable("ok", FieldKind::Bool),
        FieldDescriptor::nullable("update_id", FieldKind::Int),
        FieldDescriptor::nullable("user_id", FieldKind::Int),
        FieldDescriptor::nullable("message_id", FieldKind::Int),
        FieldDescriptor::nullable("text", FieldKind::Str),
        FieldDescriptor::nullable("callback_id", FieldKind::Str),
        FieldDescriptor::nullable("payload", FieldKind::EmbeddedJson),
    ],
);

/// Layout of an outbound call's response record.
pub static RESPONSE_DESCRIPTOR: Descriptor = Descriptor::new(
    "response",
    &[
        FieldDescriptor::required("ok", FieldKind::Bool),
        FieldDescriptor::nullable("result", FieldKind::EmbeddedJson),
        FieldDescriptor::nullable("error_code", FieldKind::Int),
        FieldDescriptor::nullable("description", FieldKind::Str),
    ],
);

// =============================================================================
// Update Record
// =============================================================================

/// A decoded inbound update.
///
/// Records are snapshots: they are built in one pass from the native record
/// and never refer back to it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateRecord {
    /// Update kind.
    pub kind: UpdateKind,
    /// Chat the update belongs to.
    pub chat_id: i64,
    /// `false` when the transport could not extract the content.
    #[serde(default)]
    pub ok: Option<bool>,
    /// Transport-side sequence number.
    #[serde(default)]
    pub update_id: Option<i64>,
    /// Sender of the update.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Message the update refers to.
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Message text, or callback data for callback queries.
    #[serde(default)]
    pub text: Option<String>,
    /// Callback query identifier, needed to answer the query.
    #[serde(default)]
    pub callback_id: Option<String>,
    /// The full protocol object for fields not modeled here.
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(skip)]
    fields: Map<String, Value>,
}

impl UpdateRecord {
    /// Returns the text used for subscription matching.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns whether the transport extracted the content successfully.
    pub fn is_supported(&self) -> bool {
        self.ok.unwrap_or(true)
    }

    /// Returns the structured object the record was built from.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Decodes a native update record.
///
/// # Errors
///
/// Returns a [`ParseError`] if the record is invalid, does not match
/// [`UPDATE_DESCRIPTOR`], carries an unknown kind, or holds a malformed payload.
pub fn parse_update(record: &dyn NativeRecord) -> ParseResult<UpdateRecord> {
    let fields = decode(record, &UPDATE_DESCRIPTOR)?;
    let mut update: UpdateRecord = from_object(&fields, &UPDATE_DESCRIPTOR)?;
    update.fields = fields;
    Ok(update)
}

// =============================================================================
// Response Record
// =============================================================================

/// A decoded response to an outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Result payload on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Protocol error code on failure.
    #[serde(default)]
    pub error_code: Option<i64>,
    /// Human-readable failure description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ResponseRecord {
    /// Builds a failed response with the given description.
    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error_code: None,
            description: Some(description.into()),
        }
    }

    /// Returns whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.ok
    }

    /// Returns the failure description, if the call failed.
    pub fn error_description(&self) -> Option<&str> {
        if self.ok {
            None
        } else {
            self.description.as_deref()
        }
    }

    /// Returns the `message_id` carried by the result, if any.
    pub fn message_id(&self) -> Option<i64> {
        self.result
            .as_ref()
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64)
    }
}

/// Decodes a native response record.
///
/// A failed response always carries a description; when the record has none
/// one is derived from the error code.
///
/// # Errors
///
/// Returns a [`ParseError`] if the record is invalid, does not match
/// [`RESPONSE_DESCRIPTOR`], or its result is malformed JSON.
pub fn parse_response(record: &dyn NativeRecord) -> ParseResult<ResponseRecord> {
    let fields = decode(record, &RESPONSE_DESCRIPTOR)?;
    let mut response: ResponseRecord = from_object(&fields, &RESPONSE_DESCRIPTOR)?;
    if !response.ok && response.description.is_none() {
        response.description = Some(match response.error_code {
            Some(code) => format!("request failed with error code {code}"),
            None => "request failed without description".to_string(),
        });
    }
    Ok(response)
}

fn from_object<T>(fields: &Map<String, Value>, descriptor: &Descriptor) -> Result<T, ParseError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(Value::Object(fields.clone())).map_err(|e| {
        DecodeError::Schema {
            descriptor: descriptor.name,
            reason: e.to_string(),
        }
        .into()
    })
}
