//! Field shapes for the built-in Sitecore field types.
//!
//! None of these are required by the parser; they are just the shapes most
//! callers decode into. Custom field types only need `Deserialize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Fields;
use crate::layout::EditableChrome;

/// A field value plus the editing markup the service may send with it.
///
/// `opening_chrome`/`closing_chrome` are only present after chrome injection
/// decorated the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct EditableField<T> {
    #[serde(default)]
    pub value: T,
    /// Full editable markup ("editable" in the payload).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_first_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_last_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_chrome: Option<EditableChrome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_chrome: Option<EditableChrome>,
}

impl<T> EditableField<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            editable: None,
            editable_first_part: None,
            editable_last_part: None,
            metadata: None,
            opening_chrome: None,
            closing_chrome: None,
        }
    }

    /// True when chrome injection wrapped this field.
    pub fn has_chromes(&self) -> bool {
        self.opening_chrome.is_some() && self.closing_chrome.is_some()
    }
}

pub type TextField = EditableField<String>;
pub type RichTextField = EditableField<String>;
pub type NumberField = EditableField<Option<f64>>;
pub type CheckboxField = EditableField<bool>;
pub type DateField = EditableField<Option<DateTime<Utc>>>;
pub type HyperLinkField = EditableField<HyperLink>;
pub type ImageField = EditableField<Image>;

/// Editing metadata attached to a field in metadata editing mode.
///
/// Serialized as the content of a field's opening chrome; the authoring
/// client reads it to map DOM nodes back to fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
}

/// The item a field value was read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<u32>,
}

/// Versions arrive as numbers from some services and strings from others.
pub(crate) fn deserialize_lenient_version<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum VersionValue {
        Number(u32),
        Text(String),
    }

    let opt: Option<VersionValue> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(VersionValue::Number(n)) => Ok(Some(n)),
        Some(VersionValue::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(VersionValue::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid version \"{}\"", s))),
    }
}

/// General link field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub querystring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// "internal", "external", "media", "mailto", "anchor", "javascript".
    #[serde(default, rename = "linktype", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Image field value. Dimensions are strings in the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// Reference to another item, with that item's own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLink {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

pub type ItemLinkField = ItemLink;

/// Multilist/treelist values: a plain array of item links.
pub type ContentListField = Vec<ItemLink>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldReader;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_link_field_with_editable_parts() {
        let reader = FieldReader::parse(
            r#"{
                "value": {"href": "https://example.com", "text": "Example", "target": "_blank", "linktype": "external"},
                "editableFirstPart": "<a href=\"https://example.com\">",
                "editableLastPart": "</a>"
            }"#,
        )
        .unwrap();
        let link: HyperLinkField = reader.decode().unwrap();
        assert_eq!(link.value.href.as_deref(), Some("https://example.com"));
        assert_eq!(link.value.target.as_deref(), Some("_blank"));
        assert_eq!(link.editable_last_part.as_deref(), Some("</a>"));
        assert!(!link.has_chromes());
    }

    #[test]
    fn test_image_field() {
        let reader = FieldReader::parse(
            r#"{"value": {"src": "/-/media/hero.jpg", "alt": "Hero", "width": "1200", "height": "400"}}"#,
        )
        .unwrap();
        let image: ImageField = reader.decode().unwrap();
        assert_eq!(image.value.width.as_deref(), Some("1200"));
    }

    #[test]
    fn test_date_field() {
        let reader = FieldReader::parse(r#"{"value": "2024-03-05T10:30:00Z"}"#).unwrap();
        let date: DateField = reader.decode().unwrap();
        let parsed = date.value.unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-05T10:30:00+00:00");
    }

    #[test]
    fn test_checkbox_and_number() {
        let checkbox: CheckboxField = FieldReader::parse(r#"{"value": true}"#)
            .unwrap()
            .decode()
            .unwrap();
        assert!(checkbox.value);

        let number: NumberField = FieldReader::parse(r#"{"value": 3}"#)
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(number.value, Some(3.0));
    }

    #[test]
    fn test_content_list_with_nested_fields() {
        let reader = FieldReader::parse(
            r#"[
                {"id": "a1", "name": "First", "fields": {"Title": {"value": "One"}}},
                {"id": "b2", "name": "Second", "fields": {"Title": {"value": "Two"}}}
            ]"#,
        )
        .unwrap();
        let list: ContentListField = reader.decode().unwrap();
        assert_eq!(list.len(), 2);
        let title: TextField = list[1].fields["Title"].decode().unwrap();
        assert_eq!(title.value, "Two");
    }

    #[test]
    fn test_metadata_version_as_string() {
        let metadata: FieldMetadata = serde_json::from_str(
            r#"{"datasource": {"id": "{A}", "language": "en", "revision": "r1", "version": "2"}, "fieldId": "{F}"}"#,
        )
        .unwrap();
        assert_eq!(metadata.datasource.unwrap().version, Some(2));
        assert_eq!(metadata.field_id.as_deref(), Some("{F}"));
    }
}
