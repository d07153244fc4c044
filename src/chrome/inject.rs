//! Chrome injection: rebuild a content tree with editing markers.
//!
//! The rebuild only inserts. Sibling order is untouched, unresolved entries
//! and chromes already in the payload stay where they are, and nesting depth
//! is unbounded. Running it twice wraps everything twice.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ChromeFeed, ChromeMarker};
use crate::field::{FieldMetadata, FieldReader, Fields};
use crate::layout::{
    ATTR_CHROME_TYPE, ATTR_ID, ATTR_KIND, ChromeKind, ChromeType, Component, EditableChrome,
    LayoutResponse, NIL_ID, Placeholder, PlaceholderItem, Placeholders, Route,
};

/// Keys added to a decorated field's JSON.
const OPENING_CHROME_KEY: &str = "openingChrome";
const CLOSING_CHROME_KEY: &str = "closingChrome";
const METADATA_KEY: &str = "metadata";

/// What one injection pass decorated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InjectionStats {
    pub placeholders: usize,
    pub renderings: usize,
    pub fields: usize,
}

impl InjectionStats {
    /// Markers added to placeholder item lists (fields excluded).
    pub fn placeholder_markers(&self) -> usize {
        2 * (self.placeholders + self.renderings)
    }
}

/// Decorate a whole response with every placeholder, rendering and editable
/// field wrapped in chromes.
pub fn inject_chromes(response: LayoutResponse, feed: &ChromeFeed) -> LayoutResponse {
    ChromeInjector::new(feed).inject(response)
}

/// Walks a content tree and rebuilds it with editing chromes.
pub struct ChromeInjector<'a> {
    feed: &'a ChromeFeed,
    stats: InjectionStats,
}

impl<'a> ChromeInjector<'a> {
    pub fn new(feed: &'a ChromeFeed) -> Self {
        Self {
            feed,
            stats: InjectionStats::default(),
        }
    }

    /// Counts for everything decorated by this injector so far.
    pub fn stats(&self) -> InjectionStats {
        self.stats
    }

    pub fn inject(&mut self, response: LayoutResponse) -> LayoutResponse {
        let LayoutResponse {
            sitecore,
            context_raw,
        } = response;

        let sitecore = sitecore.map(|mut data| {
            data.route = data.route.map(|route| self.inject_route(route));
            data
        });

        debug!(
            placeholders = self.stats.placeholders,
            renderings = self.stats.renderings,
            fields = self.stats.fields,
            "chrome injection finished"
        );

        LayoutResponse {
            sitecore,
            context_raw,
        }
    }

    pub fn inject_route(&mut self, mut route: Route) -> Route {
        route.fields = self.decorate_fields(None, std::mem::take(&mut route.fields));
        route.placeholders = self.decorate_placeholders(std::mem::take(&mut route.placeholders));
        route
    }

    fn decorate_placeholders(&mut self, placeholders: Placeholders) -> Placeholders {
        placeholders
            .into_iter()
            .map(|(key, placeholder)| {
                let placeholder = self.decorate_placeholder(&key, placeholder);
                (key, placeholder)
            })
            .collect()
    }

    fn decorate_placeholder(&mut self, key: &str, placeholder: Placeholder) -> Placeholder {
        let decorated = self.feed.decorates_placeholder(key);
        let anchor = placeholder
            .components()
            .next()
            .map(|component| component.id.clone())
            .unwrap_or_else(|| NIL_ID.to_string());
        let chrome_id = format!("{}_{}", key, anchor);

        let mut items = Vec::with_capacity(placeholder.len() * 3 + 2);
        if decorated {
            self.stats.placeholders += 1;
            items.push(PlaceholderItem::Chrome(self.placeholder_chrome(
                key,
                &chrome_id,
                ChromeKind::Open,
            )));
        }

        for item in placeholder.items {
            match item {
                PlaceholderItem::Component(component) => {
                    let component = self.decorate_component(component);
                    if decorated {
                        self.stats.renderings += 1;
                        let id = component.id.clone();
                        items.push(PlaceholderItem::Chrome(
                            self.rendering_chrome(&id, ChromeKind::Open),
                        ));
                        items.push(PlaceholderItem::Component(component));
                        items.push(PlaceholderItem::Chrome(
                            self.rendering_chrome(&id, ChromeKind::Close),
                        ));
                    } else {
                        items.push(PlaceholderItem::Component(component));
                    }
                }
                other => items.push(other),
            }
        }

        if decorated {
            items.push(PlaceholderItem::Chrome(self.placeholder_chrome(
                key,
                &chrome_id,
                ChromeKind::Close,
            )));
        }
        Placeholder::new(items)
    }

    fn decorate_component(&mut self, component: Component) -> Component {
        let Component {
            id,
            name,
            data_source,
            parameters,
            fields,
            placeholders,
        } = component;
        let fields = self.decorate_fields(Some(&id), fields);
        let placeholders = self.decorate_placeholders(placeholders);
        Component {
            id,
            name,
            data_source,
            parameters,
            fields,
            placeholders,
        }
    }

    fn placeholder_chrome(&self, key: &str, chrome_id: &str, kind: ChromeKind) -> EditableChrome {
        EditableChrome::marker(ChromeType::Placeholder, kind, Some(chrome_id))
            .with_content(marker_content(self.feed.placeholder(key, kind)))
    }

    fn rendering_chrome(&self, uid: &str, kind: ChromeKind) -> EditableChrome {
        EditableChrome::marker(ChromeType::Rendering, kind, Some(uid))
            .with_content(marker_content(self.feed.rendering(uid, kind)))
    }

    fn decorate_fields(&mut self, rendering: Option<&str>, fields: Fields) -> Fields {
        fields
            .into_iter()
            .map(|(name, reader)| {
                let reader = self.decorate_field(rendering, &name, reader);
                (name, reader)
            })
            .collect()
    }

    /// Attach opening/closing chromes to a field's own JSON when the field is
    /// editable. Fields that are not objects are left alone.
    fn decorate_field(&mut self, rendering: Option<&str>, name: &str, reader: FieldReader) -> FieldReader {
        let (mut object, inline) = match reader.as_json() {
            Some(Value::Object(object)) => {
                let inline = object
                    .get(METADATA_KEY)
                    .and_then(|m| serde_json::from_value::<FieldMetadata>(m.clone()).ok());
                (object.clone(), inline)
            }
            _ => return reader,
        };

        let field_id = inline.as_ref().and_then(|m| m.field_id.as_deref());
        let open_marker = self.feed.field(rendering, name, field_id, ChromeKind::Open);
        let close_marker = self.feed.field(rendering, name, field_id, ChromeKind::Close);
        let metadata = match (open_marker, inline) {
            (Some(marker), inline) => marker
                .metadata
                .clone()
                .or(inline)
                .unwrap_or_else(|| marker_metadata(name, marker, &object)),
            (None, Some(inline)) => inline,
            (None, None) => return reader,
        };

        let Ok(content) = serde_json::to_string(&metadata) else {
            warn!(field = name, "could not serialize field metadata");
            return reader;
        };
        let opening = EditableChrome::marker(ChromeType::Field, ChromeKind::Open, None)
            .with_content(content);
        let closing = EditableChrome::marker(ChromeType::Field, ChromeKind::Close, None)
            .with_content(marker_content(close_marker));

        let (Ok(opening), Ok(closing)) =
            (serde_json::to_value(&opening), serde_json::to_value(&closing))
        else {
            warn!(field = name, "could not serialize field chromes");
            return reader;
        };
        object.insert(OPENING_CHROME_KEY.to_string(), opening);
        object.insert(CLOSING_CHROME_KEY.to_string(), closing);

        match FieldReader::from_value(&Value::Object(object)) {
            Ok(decorated) => {
                self.stats.fields += 1;
                decorated
            }
            Err(err) => {
                warn!(field = name, error = %err, "could not rebuild decorated field");
                reader
            }
        }
    }
}

/// Metadata for a field the feed marks editable without describing it.
fn marker_metadata(name: &str, marker: &ChromeMarker, field: &Map<String, Value>) -> FieldMetadata {
    let raw_value = match field.get("value") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };
    FieldMetadata {
        title: Some(name.to_string()),
        field_id: Some(marker.target.clone()),
        raw_value,
        ..Default::default()
    }
}

/// Extra descriptor attributes as the chrome's JSON content.
fn marker_content(marker: Option<&ChromeMarker>) -> String {
    let Some(marker) = marker else {
        return String::new();
    };
    let extra: indexmap::IndexMap<&str, &str> = marker
        .attributes
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), ATTR_CHROME_TYPE | ATTR_KIND | ATTR_ID))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if extra.is_empty() {
        return String::new();
    }
    serde_json::to_string(&extra).unwrap_or_default()
}
