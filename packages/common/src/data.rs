//! # Document Model
//!
//! The serializable page document edited by the reducer.
//!
//! ```text
//! Data
//!  ├── root    { props }                     page-level props
//!  ├── content [ComponentData]               root zone, render order
//!  └── zones   { "parent:name": [ComponentData] }   nested drop areas
//! ```
//!
//! Slot content is not stored in `zones`: it lives inline in the owning
//! component's props as an array of `ComponentData` under the slot's name.

use crate::zone::ZoneId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Free-form property bag
pub type PropMap = Map<String, Value>;

/// Ordered children of a zone
pub type Content = Vec<ComponentData>;

/// One placed instance of a configured component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentData {
    #[serde(rename = "type")]
    pub component_type: String,

    pub props: Props,
}

/// Component props: the instance id, the drag placeholder marker and
/// whatever fields the component type defines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Props {
    #[serde(default)]
    pub id: String,

    #[serde(
        rename = "__placeholder",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub placeholder: bool,

    #[serde(flatten)]
    pub fields: PropMap,
}

impl ComponentData {
    pub fn new(component_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            props: Props {
                id: id.into(),
                placeholder: false,
                fields: PropMap::new(),
            },
        }
    }

    /// Builder-style prop setter
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.fields.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.props.id
    }

    pub fn is_placeholder(&self) -> bool {
        self.props.placeholder
    }
}

/// Page-level node. Keys found next to `props` are kept as-is; they are
/// where legacy documents stored root props.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootData {
    #[serde(default)]
    pub props: PropMap,

    #[serde(flatten)]
    pub legacy: PropMap,
}

/// Full document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(default)]
    pub root: RootData,

    #[serde(default)]
    pub content: Content,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub zones: BTreeMap<ZoneId, Content>,
}

impl Data {
    /// Parse a fully-formed document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Content of a dropzone or the root zone. Slots are not reachable here.
    pub fn zone_content(&self, zone: &ZoneId) -> Option<&Content> {
        if zone.is_root() {
            Some(&self.content)
        } else {
            self.zones.get(zone)
        }
    }
}

/// Inbound document as supplied by callers; everything is optional and
/// `root` may still be in the legacy shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PropMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<BTreeMap<ZoneId, Content>>,
}

impl PartialData {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Data> for PartialData {
    fn from(data: Data) -> Self {
        let mut root = data.root.legacy;
        root.insert("props".to_string(), Value::Object(data.root.props));

        Self {
            root: Some(root),
            content: Some(data.content),
            zones: Some(data.zones),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_data_shape() {
        let json = json!({
            "type": "Heading",
            "props": { "id": "Heading-1", "title": "Hello" }
        });

        let component: ComponentData = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(component.component_type, "Heading");
        assert_eq!(component.id(), "Heading-1");
        assert_eq!(component.props.fields.get("title"), Some(&json!("Hello")));
        assert!(!component.is_placeholder());

        // Placeholder marker is omitted when unset
        assert_eq!(serde_json::to_value(&component).unwrap(), json);
    }

    #[test]
    fn test_placeholder_marker() {
        let component: ComponentData = serde_json::from_value(json!({
            "type": "Heading",
            "props": { "id": "drawer-Heading", "__placeholder": true }
        }))
        .unwrap();

        assert!(component.is_placeholder());
        assert!(!component.props.fields.contains_key("__placeholder"));
    }

    #[test]
    fn test_zones_omitted_when_empty() {
        let data = Data::default();
        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("zones").is_none());
        assert_eq!(value["content"], json!([]));
    }

    #[test]
    fn test_partial_data_accepts_legacy_root() {
        let partial = PartialData::from_json(r#"{ "root": { "title": "X" } }"#).unwrap();
        assert_eq!(partial.root.unwrap().get("title"), Some(&json!("X")));
        assert!(partial.content.is_none());
    }
}
