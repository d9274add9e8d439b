//! Descriptor-driven decoding of native records.
//!
//! The transport hands the core opaque records whose layout is described by a
//! static [`Descriptor`]. [`decode`] borrows the record for the duration of a
//! single call and produces a fully materialized JSON object, so callers never
//! observe a half-updated record.
//!
//! ```rust,ignore
//! static PING: Descriptor = Descriptor::new(
//!     "ping",
//!     &[
//!         FieldDescriptor::required("ok", FieldKind::Bool),
//!         FieldDescriptor::nullable("result", FieldKind::EmbeddedJson),
//!     ],
//! );
//!
//! let record = RawRecord::new().with("ok", true).with("result", r#"{"pong":1}"#);
//! let object = decode(&record, &PING)?;
//! assert_eq!(object["result"]["pong"], 1);
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::foundation::error::{DecodeError, ParseResult, PayloadParseError};

// =============================================================================
// Schema
// =============================================================================

/// The declared type of a record field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A boolean flag.
    Bool,
    /// A signed integer.
    Int,
    /// A UTF-8 string.
    Str,
    /// A string carrying JSON text, decoded into a nested value.
    EmbeddedJson,
    /// A nested record with its own layout.
    Record(&'static Descriptor),
}

impl FieldKind {
    /// Returns a short name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "string",
            Self::EmbeddedJson => "json string",
            Self::Record(_) => "record",
        }
    }
}

/// Layout entry for one field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Field name, used both for lookup and as the output key.
    pub name: &'static str,
    /// Declared type.
    pub kind: FieldKind,
    /// Whether the field may be absent or null.
    pub nullable: bool,
}

impl FieldDescriptor {
    /// A field that must always be present.
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    /// A field that decodes to `null` when absent.
    pub const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// Schema of one record shape.
#[derive(Debug)]
pub struct Descriptor {
    /// Name of the record shape (e.g. `"update"`).
    pub name: &'static str,
    /// Field layout, in output order.
    pub fields: &'static [FieldDescriptor],
}

impl Descriptor {
    /// Creates a descriptor.
    pub const fn new(name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { name, fields }
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// =============================================================================
// Native Records
// =============================================================================

/// A value as stored in a native record.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// No value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    Str(String),
    /// A nested record.
    Record(RawRecord),
}

impl NativeValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::Record(_) => "record",
        }
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<RawRecord> for NativeValue {
    fn from(v: RawRecord) -> Self {
        Self::Record(v)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Read access to a record owned by the transport.
///
/// Implementations only need to answer lookups by field name; the layout is
/// dictated by the [`Descriptor`] passed to [`decode`].
pub trait NativeRecord {
    /// Returns whether the record may still be read.
    fn is_valid(&self) -> bool {
        true
    }

    /// Returns the stored value for `name`, if any.
    fn field(&self, name: &str) -> Option<&NativeValue>;
}

/// A simple owned record, used by transports to hand data to the core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: BTreeMap<String, NativeValue>,
    released: bool,
}

impl RawRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field (builder pattern).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<NativeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<NativeValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Releases the record; any later decode fails with
    /// [`DecodeError::InvalidHandle`].
    pub fn release(&mut self) {
        self.fields.clear();
        self.released = true;
    }

    /// Returns the number of stored fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl NativeRecord for RawRecord {
    fn is_valid(&self) -> bool {
        !self.released
    }

    fn field(&self, name: &str) -> Option<&NativeValue> {
        self.fields.get(name)
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes `record` into a JSON object following `descriptor` exactly.
///
/// Every descriptor field appears in the output; nullable fields that are
/// absent decode to `null`. Fields the descriptor does not name are ignored.
///
/// # Errors
///
/// - [`DecodeError`] if the handle is released, a required field is missing,
///   or a field holds a representation other than the declared one.
/// - [`PayloadParseError`] if an [`FieldKind::EmbeddedJson`] field is not
///   valid JSON.
pub fn decode(
    record: &dyn NativeRecord,
    descriptor: &Descriptor,
) -> ParseResult<Map<String, Value>> {
    if !record.is_valid() {
        return Err(DecodeError::InvalidHandle {
            descriptor: descriptor.name,
        }
        .into());
    }

    let mut object = Map::with_capacity(descriptor.fields.len());
    for field in descriptor.fields {
        let value = decode_field(record.field(field.name), field, descriptor)?;
        object.insert(field.name.to_string(), value);
    }
    Ok(object)
}

fn decode_field(
    raw: Option<&NativeValue>,
    field: &FieldDescriptor,
    descriptor: &Descriptor,
) -> ParseResult<Value> {
    let value = match (field.kind, raw) {
        (_, None | Some(NativeValue::Null)) => {
            if field.nullable {
                Value::Null
            } else {
                return Err(DecodeError::MissingField {
                    descriptor: descriptor.name,
                    field: field.name,
                }
                .into());
            }
        }
        (FieldKind::Bool, Some(NativeValue::Bool(b))) => Value::Bool(*b),
        (FieldKind::Int, Some(NativeValue::Int(i))) => Value::from(*i),
        (FieldKind::Str, Some(NativeValue::Str(s))) => Value::String(s.clone()),
        (FieldKind::EmbeddedJson, Some(NativeValue::Str(s))) => {
            serde_json::from_str(s).map_err(|source| PayloadParseError {
                field: field.name,
                raw: s.clone(),
                source,
            })?
        }
        (FieldKind::Record(nested), Some(NativeValue::Record(r))) => {
            Value::Object(decode(r, nested)?)
        }
        (kind, Some(other)) => {
            return Err(DecodeError::TypeMismatch {
                descriptor: descriptor.name,
                field: field.name,
                expected: kind.type_name(),
                found: other.type_name(),
            }
            .into());
        }
    };
    Ok(value)
}
