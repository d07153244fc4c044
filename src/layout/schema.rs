//! Wire shapes of the layout service JSON.
//!
//! Everything below the top level is kept as [`RawValue`] so each section can
//! be converted (or defaulted) on its own, and so field payloads keep their
//! original text.

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Root document: `{"sitecore": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub sitecore: Option<Box<RawValue>>,
}

/// The "sitecore" object.
#[derive(Debug, Deserialize)]
pub(crate) struct WireLayout {
    #[serde(default)]
    pub context: Option<Box<RawValue>>,
    #[serde(default)]
    pub route: Option<Box<RawValue>>,
    #[serde(default)]
    pub devices: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRoute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_language: Option<String>,
    /// Number or numeric string.
    #[serde(default)]
    pub item_version: Option<Value>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub fields: Option<Box<RawValue>>,
    #[serde(default)]
    pub placeholders: Option<Box<RawValue>>,
}

/// A component-shaped placeholder element.
///
/// Both spellings of id/name/datasource are accepted; `uid`,
/// `componentName` and `dataSource` win when both are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireComponent {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub component_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default, rename = "datasource")]
    pub datasource_lower: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
    #[serde(default)]
    pub fields: Option<Box<RawValue>>,
    #[serde(default)]
    pub placeholders: Option<Box<RawValue>>,
}

/// Derived struct visitors also accept arrays positionally; the layout
/// format only ever uses objects, so check before deserializing a struct.
pub(crate) fn is_object(raw: &RawValue) -> bool {
    raw.get().trim_start().starts_with('{')
}

/// Read a version that may be sent as a number or a string.
pub(crate) fn version_from(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parameter values are strings; anything else is kept as its JSON text.
pub(crate) fn parameter_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
