//! Layout response deserialization: JSON text → [`LayoutResponse`].

use serde_json::value::RawValue;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::ids::{IdGenerator, UuidGenerator};
use super::placeholder::PlaceholderConverter;
use super::schema::{WireLayout, WireResponse, WireRoute, is_object, version_from};
use super::types::{Context, Device, LayoutData, LayoutResponse, Route};
use crate::error::LayoutError;
use crate::field::{Fields, parse_fields};

/// Turns layout service JSON into a content tree.
///
/// Structural problems never fail the parse: a section that cannot be read
/// is defaulted and logged, and unknown properties are ignored.
pub struct LayoutDeserializer {
    ids: Box<dyn IdGenerator>,
}

impl Default for LayoutDeserializer {
    fn default() -> Self {
        Self::new(UuidGenerator)
    }
}

impl LayoutDeserializer {
    /// Create a deserializer that names id-less components with `ids`.
    pub fn new(ids: impl IdGenerator + 'static) -> Self {
        Self { ids: Box::new(ids) }
    }

    /// Deserialize a full layout response.
    ///
    /// Empty text is rejected with [`LayoutError::Argument`] and text that is
    /// not JSON with [`LayoutError::Json`]. A document without a usable
    /// "sitecore" object (such as `{}`) yields an empty response.
    pub fn deserialize(&self, json: &str) -> Result<LayoutResponse, LayoutError> {
        if json.trim().is_empty() {
            return Err(LayoutError::argument("json", "layout JSON text is empty"));
        }
        let root: Box<RawValue> = serde_json::from_str(json)?;
        if !is_object(&root) {
            warn!("layout response root is not an object");
            return Ok(LayoutResponse::default());
        }

        let sitecore = match serde_json::from_str::<WireResponse>(root.get()) {
            Ok(WireResponse {
                sitecore: Some(sitecore),
            }) => sitecore,
            Ok(_) => {
                debug!("layout response has no sitecore object");
                return Ok(LayoutResponse::default());
            }
            Err(err) => {
                warn!(error = %err, "layout response root is not readable");
                return Ok(LayoutResponse::default());
            }
        };

        if !is_object(&sitecore) {
            if sitecore.get().trim() != "null" {
                warn!("sitecore is not an object");
            }
            return Ok(LayoutResponse::default());
        }
        let layout = match serde_json::from_str::<WireLayout>(sitecore.get()) {
            Ok(layout) => layout,
            Err(err) => {
                warn!(error = %err, "sitecore object is not readable");
                return Ok(LayoutResponse::default());
            }
        };

        let context_raw = layout
            .context
            .as_deref()
            .map(context_map)
            .unwrap_or_default();
        let context = if layout.context.as_deref().is_some_and(is_object) {
            read_context(&context_raw)
        } else {
            None
        };
        let route = layout.route.as_deref().and_then(|raw| self.read_route(raw));
        let devices = layout
            .devices
            .as_deref()
            .map(read_devices)
            .unwrap_or_default();

        Ok(LayoutResponse {
            sitecore: Some(LayoutData {
                context,
                route,
                devices,
            }),
            context_raw,
        })
    }

    fn read_route(&self, raw: &RawValue) -> Option<Route> {
        if !is_object(raw) {
            if raw.get().trim() != "null" {
                warn!("route is not an object, treating as absent");
            }
            return None;
        }
        let wire = match serde_json::from_str::<WireRoute>(raw.get()) {
            Ok(wire) => wire,
            Err(err) => {
                warn!(error = %err, "route is not readable, treating as absent");
                return None;
            }
        };

        let converter = PlaceholderConverter::new(self.ids.as_ref());
        let fields = wire
            .fields
            .as_deref()
            .map(parse_fields)
            .unwrap_or_else(Fields::new);
        let placeholders = wire
            .placeholders
            .as_deref()
            .map(|raw| converter.convert_map(raw))
            .unwrap_or_default();

        Some(Route {
            name: wire.name,
            display_name: wire.display_name,
            item_id: wire.item_id,
            item_language: wire.item_language,
            item_version: wire.item_version.as_ref().and_then(version_from),
            template_id: wire.template_id,
            template_name: wire.template_name,
            database_name: wire.database_name,
            device_id: wire.device_id,
            layout_id: wire.layout_id,
            fields,
            placeholders,
        })
    }
}

/// Deserialize with random component ids.
pub fn deserialize(json: &str) -> Result<LayoutResponse, LayoutError> {
    LayoutDeserializer::default().deserialize(json)
}

fn context_map(raw: &RawValue) -> Map<String, Value> {
    match serde_json::from_str::<Map<String, Value>>(raw.get()) {
        Ok(map) => map,
        Err(err) => {
            if raw.get().trim() != "null" {
                warn!(error = %err, "context is not an object, ignoring");
            }
            Map::new()
        }
    }
}

fn read_context(raw: &Map<String, Value>) -> Option<Context> {
    match serde_json::from_value::<Context>(Value::Object(raw.clone())) {
        Ok(context) => Some(context),
        Err(err) => {
            warn!(error = %err, "context is not readable, ignoring");
            None
        }
    }
}

fn read_devices(raw: &RawValue) -> Vec<Device> {
    let elements = match serde_json::from_str::<Vec<Box<RawValue>>>(raw.get()) {
        Ok(elements) => elements,
        Err(err) => {
            if raw.get().trim() != "null" {
                warn!(error = %err, "devices is not an array, ignoring");
            }
            return Vec::new();
        }
    };
    elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| {
            if !is_object(element) {
                warn!(index, "dropping device that is not an object");
                return None;
            }
            match serde_json::from_str(element.get()) {
                Ok(device) => Some(device),
                Err(err) => {
                    warn!(index, error = %err, "dropping unreadable device");
                    None
                }
            }
        })
        .collect()
}
