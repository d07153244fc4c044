//! Content tree types.
//!
//! The tree is built by [`LayoutDeserializer`](super::LayoutDeserializer) and
//! serializes back to the same JSON shape the layout service sends, so a
//! decorated tree can be forwarded to another renderer unchanged.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field::{FieldReader, Fields};

/// Placeholder key → placeholder, in the order the service sent them.
pub type Placeholders = IndexMap<String, Placeholder>;

// ============================================================================
// RESPONSE
// ============================================================================

/// A deserialized layout service response.
///
/// `sitecore` is `None` for a structurally empty document (`{}`), which is a
/// valid "no content" result rather than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResponse {
    pub sitecore: Option<LayoutData>,
    /// The "context" object exactly as received, plus anything merged into
    /// it later (the editing dictionary).
    pub context_raw: Map<String, Value>,
}

impl LayoutResponse {
    pub fn route(&self) -> Option<&Route> {
        self.sitecore.as_ref().and_then(|data| data.route.as_ref())
    }

    pub fn context(&self) -> Option<&Context> {
        self.sitecore.as_ref().and_then(|data| data.context.as_ref())
    }

    /// Total number of components in the route tree, at any depth.
    pub fn component_count(&self) -> usize {
        self.route()
            .map(|route| count_components(&route.placeholders))
            .unwrap_or(0)
    }
}

fn count_components(placeholders: &Placeholders) -> usize {
    placeholders
        .values()
        .flat_map(Placeholder::components)
        .map(|component| 1 + count_components(&component.placeholders))
        .sum()
}

impl Serialize for LayoutResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct SitecoreOut<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            context: Option<ContextOut<'a>>,
            route: Option<&'a Route>,
            devices: &'a [Device],
        }

        #[derive(Serialize)]
        #[serde(untagged)]
        enum ContextOut<'a> {
            Raw(&'a Map<String, Value>),
            Typed(&'a Context),
        }

        let mut map = serializer.serialize_map(None)?;
        if let Some(data) = &self.sitecore {
            let context = if !self.context_raw.is_empty() {
                Some(ContextOut::Raw(&self.context_raw))
            } else {
                data.context.as_ref().map(ContextOut::Typed)
            };
            map.serialize_entry(
                "sitecore",
                &SitecoreOut {
                    context,
                    route: data.route.as_ref(),
                    devices: &data.devices,
                },
            )?;
        }
        map.end()
    }
}

/// The "sitecore" object of a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutData {
    pub context: Option<Context>,
    pub route: Option<Route>,
    pub devices: Vec<Device>,
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Per-response metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default)]
    pub page_editing: bool,
    #[serde(default)]
    pub site: Option<Site>,
    #[serde(default)]
    pub page_state: PageState,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageState {
    #[default]
    Normal,
    Edit,
    Preview,
    /// Any state this crate does not know about.
    #[serde(other)]
    Unknown,
}

// ============================================================================
// ROUTE
// ============================================================================

/// The content item resolved for the request and its placeholder tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    pub fields: Fields,
    pub placeholders: Placeholders,
}

impl Route {
    pub fn placeholder(&self, key: &str) -> Option<&Placeholder> {
        self.placeholders.get(key)
    }

    pub fn field(&self, name: &str) -> Option<&FieldReader> {
        self.fields.get(name)
    }
}

// ============================================================================
// PLACEHOLDER
// ============================================================================

/// An ordered slot of components and editing chromes.
///
/// Order is rendering order and is never changed by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Placeholder {
    pub items: Vec<PlaceholderItem>,
}

impl Placeholder {
    pub fn new(items: Vec<PlaceholderItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: PlaceholderItem) {
        self.items.push(item);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlaceholderItem> {
        self.items.iter()
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.items.iter().filter_map(PlaceholderItem::as_component)
    }

    pub fn chromes(&self) -> impl Iterator<Item = &EditableChrome> {
        self.items.iter().filter_map(PlaceholderItem::as_chrome)
    }
}

impl From<Vec<PlaceholderItem>> for Placeholder {
    fn from(items: Vec<PlaceholderItem>) -> Self {
        Self::new(items)
    }
}

impl<'a> IntoIterator for &'a Placeholder {
    type Item = &'a PlaceholderItem;
    type IntoIter = std::slice::Iter<'a, PlaceholderItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// One entry in a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderItem {
    Component(Component),
    Chrome(EditableChrome),
    /// An element that could not be read. Kept so sibling positions stay
    /// stable; serializes as `null`.
    Unresolved { reason: String },
}

impl PlaceholderItem {
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            PlaceholderItem::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn as_chrome(&self) -> Option<&EditableChrome> {
        match self {
            PlaceholderItem::Chrome(chrome) => Some(chrome),
            _ => None,
        }
    }
}

impl Serialize for PlaceholderItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlaceholderItem::Component(component) => component.serialize(serializer),
            PlaceholderItem::Chrome(chrome) => chrome.serialize(serializer),
            PlaceholderItem::Unresolved { .. } => serializer.serialize_none(),
        }
    }
}

// ============================================================================
// COMPONENT
// ============================================================================

/// A rendering placed in a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "uid")]
    pub id: String,
    #[serde(rename = "componentName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(rename = "params")]
    pub parameters: IndexMap<String, String>,
    pub fields: Fields,
    pub placeholders: Placeholders,
}

impl Component {
    /// An empty component with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            data_source: None,
            parameters: IndexMap::new(),
            fields: Fields::new(),
            placeholders: Placeholders::new(),
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(id)
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldReader> {
        self.fields.get(name)
    }

    pub fn placeholder(&self, key: &str) -> Option<&Placeholder> {
        self.placeholders.get(key)
    }
}

// ============================================================================
// EDITABLE CHROME
// ============================================================================

pub const DEFAULT_CHROME_NAME: &str = "code";
pub const DEFAULT_CHROME_TYPE: &str = "text/sitecore";

pub const ATTR_CHROME_TYPE: &str = "chrometype";
pub const ATTR_KIND: &str = "kind";
pub const ATTR_ID: &str = "id";

fn default_chrome_name() -> String {
    DEFAULT_CHROME_NAME.to_string()
}

fn default_chrome_type() -> String {
    DEFAULT_CHROME_TYPE.to_string()
}

/// What an editing chrome decorates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromeType {
    Placeholder,
    Rendering,
    Field,
}

impl ChromeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChromeType::Placeholder => "placeholder",
            ChromeType::Rendering => "rendering",
            ChromeType::Field => "field",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "placeholder" => Some(ChromeType::Placeholder),
            "rendering" => Some(ChromeType::Rendering),
            "field" => Some(ChromeType::Field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromeKind {
    Open,
    Close,
}

impl ChromeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChromeKind::Open => "open",
            ChromeKind::Close => "close",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(ChromeKind::Open),
            "close" => Some(ChromeKind::Close),
            _ => None,
        }
    }
}

/// A synthetic editor marker, rendered as
/// `<code type="text/sitecore" chrometype=".." kind="..">contents</code>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableChrome {
    /// HTML tag name.
    #[serde(default = "default_chrome_name")]
    pub name: String,
    #[serde(rename = "type", default = "default_chrome_type")]
    pub type_name: String,
    #[serde(rename = "contents", default)]
    pub content: String,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl Default for EditableChrome {
    fn default() -> Self {
        Self {
            name: default_chrome_name(),
            type_name: default_chrome_type(),
            content: String::new(),
            attributes: IndexMap::new(),
        }
    }
}

impl EditableChrome {
    /// A marker with `chrometype`, `kind` and, when given, `id` attributes.
    pub fn marker(chrome_type: ChromeType, kind: ChromeKind, id: Option<&str>) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert(ATTR_CHROME_TYPE.to_string(), chrome_type.as_str().to_string());
        attributes.insert(ATTR_KIND.to_string(), kind.as_str().to_string());
        if let Some(id) = id {
            attributes.insert(ATTR_ID.to_string(), id.to_string());
        }
        Self {
            attributes,
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn chrome_type(&self) -> Option<ChromeType> {
        self.attributes
            .get(ATTR_CHROME_TYPE)
            .and_then(|s| ChromeType::parse(s))
    }

    pub fn kind(&self) -> Option<ChromeKind> {
        self.attributes.get(ATTR_KIND).and_then(|s| ChromeKind::parse(s))
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get(ATTR_ID).map(String::as_str)
    }

    pub fn is_open(&self) -> bool {
        self.kind() == Some(ChromeKind::Open)
    }

    pub fn is_close(&self) -> bool {
        self.kind() == Some(ChromeKind::Close)
    }
}

// ============================================================================
// DEVICES
// ============================================================================

/// A device-specific layout definition, independent of the route tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub placeholders: Vec<DevicePlaceholder>,
    #[serde(default)]
    pub renderings: Vec<DeviceRendering>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePlaceholder {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRendering {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chrome_defaults() {
        let chrome: EditableChrome =
            serde_json::from_str(r#"{"attributes": {"chrometype": "field", "kind": "open"}}"#)
                .unwrap();
        assert_eq!(chrome.name, "code");
        assert_eq!(chrome.type_name, "text/sitecore");
        assert_eq!(chrome.chrome_type(), Some(ChromeType::Field));
        assert!(chrome.is_open());
        assert_eq!(chrome.id(), None);
    }

    #[test]
    fn test_marker_attribute_order() {
        let chrome = EditableChrome::marker(ChromeType::Rendering, ChromeKind::Close, Some("r1"));
        let keys: Vec<&str> = chrome.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["chrometype", "kind", "id"]);
        assert!(chrome.is_close());
        assert_eq!(chrome.id(), Some("r1"));
    }

    #[test]
    fn test_page_state_unknown() {
        let context: Context =
            serde_json::from_str(r#"{"pageState": "experimental", "pageEditing": true}"#).unwrap();
        assert_eq!(context.page_state, PageState::Unknown);
        assert!(context.page_editing);
    }

    #[test]
    fn test_unresolved_serializes_as_null() {
        let placeholder = Placeholder::new(vec![
            PlaceholderItem::Component(Component::named("c1", "Hero")),
            PlaceholderItem::Unresolved {
                reason: "not an object".into(),
            },
        ]);
        let json = serde_json::to_value(&placeholder).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"uid": "c1", "componentName": "Hero", "params": {}, "fields": {}, "placeholders": {}},
                null
            ])
        );
    }

    #[test]
    fn test_empty_response_serializes_as_empty_object() {
        let json = serde_json::to_string(&LayoutResponse::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
