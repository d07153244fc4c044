//! # Fields
//!
//! Every field in a layout response is kept as raw JSON inside a
//! [`FieldReader`] until a caller asks for a concrete shape. The parser never
//! needs to know which field types exist: `decode::<TextField>()`,
//! `decode::<HyperLinkField>()` or a caller's own `#[derive(Deserialize)]`
//! type all work against the same reader.
//!
//! ```
//! use sitecore_layout::field::{fields_from_str, TextField};
//!
//! let fields = fields_from_str(r#"{"heading": {"value": "Hello"}}"#).unwrap();
//! let heading: TextField = fields["heading"].decode().unwrap();
//! assert_eq!(heading.value, "Hello");
//! ```

pub mod types;

pub use types::*;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_json::value::RawValue;
use std::cell::OnceCell;
use std::fmt;
use tracing::debug;

use crate::error::FieldDecodeError;

/// Key used when a "fields" payload is not a JSON object.
pub const CUSTOM_CONTENT_FIELD: &str = "customContentField";

/// Field name → reader, in the order the service sent them.
pub type Fields = IndexMap<String, FieldReader>;

// ============================================================================
// FIELD READER
// ============================================================================

/// Deferred, typed access to one raw field value.
///
/// The raw text is kept verbatim; the parsed document is built on the first
/// decode and reused afterwards. Not `Sync`: a reader may move between
/// threads but must not be decoded from two threads at once.
#[derive(Clone)]
pub struct FieldReader {
    raw: Box<RawValue>,
    parsed: OnceCell<Value>,
}

impl FieldReader {
    /// Wrap a raw JSON value.
    pub fn new(raw: Box<RawValue>) -> Self {
        Self {
            raw,
            parsed: OnceCell::new(),
        }
    }

    /// Parse a reader from JSON text.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Build a reader from an already-parsed value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let raw = serde_json::value::to_raw_value(value)?;
        let reader = Self::new(raw);
        let _ = reader.parsed.set(value.clone());
        Ok(reader)
    }

    /// The original JSON text of this field, untouched.
    pub fn raw_value(&self) -> &str {
        self.raw.get()
    }

    /// Decode the field as `T`, failing with the requested type name.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FieldDecodeError> {
        let value = self.parsed().map_err(decode_error::<T>)?;
        T::deserialize(value).map_err(decode_error::<T>)
    }

    /// Decode the field as `T`, or `None` if the JSON does not fit.
    pub fn try_decode<T: DeserializeOwned>(&self) -> Option<T> {
        self.decode().ok()
    }

    /// The parsed JSON document, if the raw text is valid JSON.
    pub fn as_json(&self) -> Option<&Value> {
        self.parsed().ok()
    }

    fn parsed(&self) -> Result<&Value, serde_json::Error> {
        if let Some(value) = self.parsed.get() {
            return Ok(value);
        }
        let value: Value = serde_json::from_str(self.raw.get())?;
        Ok(self.parsed.get_or_init(|| value))
    }
}

fn decode_error<T>(err: serde_json::Error) -> FieldDecodeError {
    FieldDecodeError {
        type_name: std::any::type_name::<T>(),
        message: err.to_string(),
    }
}

impl fmt::Debug for FieldReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldReader").field(&self.raw.get()).finish()
    }
}

impl PartialEq for FieldReader {
    fn eq(&self, other: &Self) -> bool {
        self.raw.get() == other.raw.get()
    }
}

impl Serialize for FieldReader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Readers nested inside decoded values (item links, content lists) go
/// through a `Value`, so their raw text is re-serialized rather than verbatim.
impl<'de> Deserialize<'de> for FieldReader {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FieldReader::from_value(&value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// FIELD DICTIONARY PARSER
// ============================================================================

/// Build a field map from the raw "fields" token of a route or component.
///
/// An object maps each key to its own reader. `null` gives an empty map.
/// Anything else (arrays, scalars) is kept whole under
/// [`CUSTOM_CONTENT_FIELD`] so no content is lost.
pub fn parse_fields(raw: &RawValue) -> Fields {
    match serde_json::from_str::<IndexMap<String, Box<RawValue>>>(raw.get()) {
        Ok(map) => map
            .into_iter()
            .map(|(name, value)| (name, FieldReader::new(value)))
            .collect(),
        Err(_) if raw.get().trim() == "null" => Fields::new(),
        Err(err) => {
            debug!(error = %err, "fields payload is not an object, wrapping as {CUSTOM_CONTENT_FIELD}");
            let mut fields = Fields::new();
            fields.insert(
                CUSTOM_CONTENT_FIELD.to_string(),
                FieldReader::new(raw.to_owned()),
            );
            fields
        }
    }
}

/// Parse a field map straight from JSON text.
pub fn fields_from_str(json: &str) -> Result<Fields, serde_json::Error> {
    let raw: Box<RawValue> = serde_json::from_str(json)?;
    Ok(parse_fields(&raw))
}
