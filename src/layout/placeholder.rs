//! Placeholder conversion: JSON arrays of mixed components and chromes.
//!
//! Each array element is classified on its own. An object whose `attributes`
//! carry `chrometype` or `kind` is an [`EditableChrome`]; any other object is
//! a [`Component`], whose nested placeholders are converted the same way.
//! Elements that cannot be read become [`PlaceholderItem::Unresolved`] so
//! one bad entry never costs the rest of the page.

use indexmap::IndexMap;
use serde_json::Value;
use serde_json::value::RawValue;
use tracing::warn;

use super::ids::IdGenerator;
use super::schema::{WireComponent, parameter_text};
use super::types::{
    ATTR_CHROME_TYPE, ATTR_KIND, Component, EditableChrome, Placeholder, PlaceholderItem,
    Placeholders,
};
use crate::field::{Fields, parse_fields};

/// Converts raw placeholder JSON into tree items.
pub struct PlaceholderConverter<'a> {
    ids: &'a dyn IdGenerator,
}

impl<'a> PlaceholderConverter<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// Convert a "placeholders" object. Anything other than an object gives
    /// an empty map.
    pub fn convert_map(&self, raw: &RawValue) -> Placeholders {
        match serde_json::from_str::<IndexMap<String, Box<RawValue>>>(raw.get()) {
            Ok(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let placeholder = self.convert(&key, &value);
                    (key, placeholder)
                })
                .collect(),
            Err(err) => {
                if raw.get().trim() != "null" {
                    warn!(error = %err, "placeholders is not an object, ignoring");
                }
                Placeholders::new()
            }
        }
    }

    /// Convert one placeholder array, preserving element order and count.
    pub fn convert(&self, key: &str, raw: &RawValue) -> Placeholder {
        let elements = match serde_json::from_str::<Vec<Box<RawValue>>>(raw.get()) {
            Ok(elements) => elements,
            Err(err) => {
                if raw.get().trim() != "null" {
                    warn!(placeholder = key, error = %err, "placeholder is not an array, ignoring");
                }
                return Placeholder::default();
            }
        };

        elements
            .iter()
            .enumerate()
            .map(|(index, element)| self.convert_item(key, index, element))
            .collect::<Vec<_>>()
            .into()
    }

    fn convert_item(&self, key: &str, index: usize, raw: &RawValue) -> PlaceholderItem {
        let probe: Value = match serde_json::from_str(raw.get()) {
            Ok(value) => value,
            Err(err) => return unresolved(key, index, err.to_string()),
        };
        let Value::Object(object) = &probe else {
            return unresolved(key, index, format!("expected object, got {}", probe));
        };

        if is_chrome_shaped(object) {
            return match serde_json::from_value::<EditableChrome>(probe) {
                Ok(chrome) => PlaceholderItem::Chrome(chrome),
                Err(err) => unresolved(key, index, err.to_string()),
            };
        }

        match serde_json::from_str::<WireComponent>(raw.get()) {
            Ok(wire) => PlaceholderItem::Component(self.convert_component(wire)),
            Err(err) => unresolved(key, index, err.to_string()),
        }
    }

    /// Build a component, generating an id when the payload has none.
    pub(crate) fn convert_component(&self, wire: WireComponent) -> Component {
        let id = wire
            .uid
            .filter(|id| !id.is_empty())
            .or(wire.id.filter(|id| !id.is_empty()))
            .unwrap_or_else(|| self.ids.next_id());

        let parameters = wire
            .params
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, parameter_text(value)))
            .collect();

        let fields = wire
            .fields
            .as_deref()
            .map(parse_fields)
            .unwrap_or_else(Fields::new);

        let placeholders = wire
            .placeholders
            .as_deref()
            .map(|raw| self.convert_map(raw))
            .unwrap_or_default();

        Component {
            id,
            name: wire.component_name.or(wire.name),
            data_source: wire.data_source.or(wire.datasource_lower),
            parameters,
            fields,
            placeholders,
        }
    }
}

/// The discriminator: chrome markers expose `chrometype`/`kind` attributes.
fn is_chrome_shaped(object: &serde_json::Map<String, Value>) -> bool {
    object
        .get("attributes")
        .and_then(Value::as_object)
        .is_some_and(|attrs| attrs.contains_key(ATTR_CHROME_TYPE) || attrs.contains_key(ATTR_KIND))
}

fn unresolved(key: &str, index: usize, reason: String) -> PlaceholderItem {
    warn!(placeholder = key, index, %reason, "dropping unreadable placeholder element");
    PlaceholderItem::Unresolved { reason }
}
