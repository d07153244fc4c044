//! # Editing Chromes
//!
//! In editing mode every placeholder, rendering and editable field is wrapped
//! in paired `<code type="text/sitecore">` markers so the authoring client can
//! find them in the rendered page. The editing service says which targets are
//! editable through a [`ChromeFeed`]; [`inject_chromes`] rebuilds a content
//! tree with the markers in place.
//!
//! ## Marker layout
//!
//! ```text
//! main:  [chrome placeholder open  id=main_<first uid>]
//!        [chrome rendering   open  id=<uid>]
//!        component <uid>            (fields carry openingChrome/closingChrome)
//!        [chrome rendering   close id=<uid>]
//!        [chrome placeholder close id=main_<first uid>]
//! ```

mod inject;

pub use inject::{ChromeInjector, InjectionStats, inject_chromes};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::field::FieldMetadata;
use crate::layout::{ChromeKind, ChromeType};

/// One open/close descriptor sent by the editing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromeMarker {
    #[serde(rename = "chrometype")]
    pub chrome_type: ChromeType,
    pub kind: ChromeKind,
    /// Placeholder key, rendering uid, or field name/field id.
    pub target: String,
    /// For field markers: the uid of the rendering that owns the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<String>,
    /// For field markers: metadata used as the opening chrome content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
    /// Extra attributes, emitted as the chrome's JSON content.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl ChromeMarker {
    pub fn new(chrome_type: ChromeType, kind: ChromeKind, target: impl Into<String>) -> Self {
        Self {
            chrome_type,
            kind,
            target: target.into(),
            rendering: None,
            metadata: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn placeholder(key: impl Into<String>) -> Self {
        Self::new(ChromeType::Placeholder, ChromeKind::Open, key)
    }

    pub fn rendering(uid: impl Into<String>) -> Self {
        Self::new(ChromeType::Rendering, ChromeKind::Open, uid)
    }

    /// An open marker for field `name` of rendering `uid`.
    pub fn field(rendering: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            rendering: Some(rendering.into()),
            ..Self::new(ChromeType::Field, ChromeKind::Open, name)
        }
    }

    pub fn closing(mut self) -> Self {
        self.kind = ChromeKind::Close;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: FieldMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Which placeholders a feed decorates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Every placeholder; markers only add attributes and field metadata.
    Everything,
    /// Only placeholders with an open marker.
    Listed,
}

/// The ordered marker descriptors for one editing response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromeFeed {
    scope: FeedScope,
    markers: Vec<ChromeMarker>,
}

impl Default for ChromeFeed {
    fn default() -> Self {
        Self::everything()
    }
}

impl ChromeFeed {
    /// Decorate every placeholder and rendering.
    pub fn everything() -> Self {
        Self {
            scope: FeedScope::Everything,
            markers: Vec::new(),
        }
    }

    /// Decorate every placeholder, using `markers` for attributes and fields.
    pub fn everything_with(markers: Vec<ChromeMarker>) -> Self {
        Self {
            scope: FeedScope::Everything,
            markers,
        }
    }

    /// Decorate only the placeholders `markers` open.
    pub fn listed(markers: Vec<ChromeMarker>) -> Self {
        Self {
            scope: FeedScope::Listed,
            markers,
        }
    }

    pub fn scope(&self) -> FeedScope {
        self.scope
    }

    pub fn markers(&self) -> &[ChromeMarker] {
        &self.markers
    }

    pub fn decorates_placeholder(&self, key: &str) -> bool {
        match self.scope {
            FeedScope::Everything => true,
            FeedScope::Listed => self.placeholder(key, ChromeKind::Open).is_some(),
        }
    }

    pub fn placeholder(&self, key: &str, kind: ChromeKind) -> Option<&ChromeMarker> {
        self.find(ChromeType::Placeholder, kind, |m| m.target == key)
    }

    pub fn rendering(&self, uid: &str, kind: ChromeKind) -> Option<&ChromeMarker> {
        self.find(ChromeType::Rendering, kind, |m| m.target == uid)
    }

    /// Find the field marker for a field, matching either its field id or
    /// its name (scoped to the owning rendering when the marker names one).
    pub fn field(
        &self,
        rendering: Option<&str>,
        name: &str,
        field_id: Option<&str>,
        kind: ChromeKind,
    ) -> Option<&ChromeMarker> {
        self.find(ChromeType::Field, kind, |m| {
            if field_id.is_some_and(|id| id == m.target) {
                return true;
            }
            m.target == name
                && match m.rendering.as_deref() {
                    Some(owner) => rendering == Some(owner),
                    None => true,
                }
        })
    }

    fn find(
        &self,
        chrome_type: ChromeType,
        kind: ChromeKind,
        matches: impl Fn(&ChromeMarker) -> bool,
    ) -> Option<&ChromeMarker> {
        self.markers
            .iter()
            .find(|m| m.chrome_type == chrome_type && m.kind == kind && matches(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_decorates_all() {
        let feed = ChromeFeed::everything();
        assert!(feed.decorates_placeholder("main"));
        assert!(feed.decorates_placeholder("anything"));
    }

    #[test]
    fn test_listed_needs_open_marker() {
        let feed = ChromeFeed::listed(vec![
            ChromeMarker::placeholder("main"),
            ChromeMarker::placeholder("footer").closing(),
        ]);
        assert!(feed.decorates_placeholder("main"));
        assert!(!feed.decorates_placeholder("footer"));
        assert!(!feed.decorates_placeholder("header"));
    }

    #[test]
    fn test_field_marker_matching() {
        let feed = ChromeFeed::everything_with(vec![
            ChromeMarker::field("r1", "Title"),
            ChromeMarker::new(ChromeType::Field, ChromeKind::Open, "{FIELD-ID}"),
        ]);
        assert!(feed.field(Some("r1"), "Title", None, ChromeKind::Open).is_some());
        assert!(feed.field(Some("r2"), "Title", None, ChromeKind::Open).is_none());
        assert!(feed.field(Some("r2"), "Body", Some("{FIELD-ID}"), ChromeKind::Open).is_some());
        assert!(feed.field(Some("r1"), "Title", None, ChromeKind::Close).is_none());
    }

    #[test]
    fn test_marker_json_shape() {
        let marker: ChromeMarker = serde_json::from_str(
            r#"{"chrometype": "rendering", "kind": "open", "target": "r1", "attributes": {"hintname": "Hero"}}"#,
        )
        .unwrap();
        assert_eq!(marker, ChromeMarker::rendering("r1").with_attribute("hintname", "Hero"));
    }
}
