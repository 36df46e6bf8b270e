use crate::data::PropMap;
use crate::result::CommonResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "pagecraft.config.json";

/// Component registry consumed by the editing core. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Registered component types keyed by type name
    #[serde(default)]
    pub components: BTreeMap<String, ComponentConfig>,

    /// Palette categories
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,

    #[serde(default)]
    pub root: RootConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Props merged underneath caller props on insert
    #[serde(default)]
    pub default_props: PropMap,

    /// Prop names holding inline child content
    #[serde(default)]
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub components: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expanded: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootConfig {
    #[serde(default)]
    pub default_props: PropMap,
}

impl Config {
    pub fn from_json(json: &str) -> CommonResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load config from a directory, falling back to an empty registry
    pub fn load(dir: &Path) -> CommonResult<Self> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Config::default())
        }
    }

    /// Look up a registered component type
    pub fn component(&self, component_type: &str) -> Option<&ComponentConfig> {
        self.components.get(component_type)
    }

    /// Slot prop names declared for a type (empty for unknown types)
    pub fn slots(&self, component_type: &str) -> &[String] {
        self.component(component_type)
            .map(|c| c.slots.as_slice())
            .unwrap_or(&[])
    }

    /// Register a component type (builder style, mostly for tests and hosts
    /// assembling the registry in code)
    pub fn with_component(mut self, name: impl Into<String>, component: ComponentConfig) -> Self {
        self.components.insert(name.into(), component);
        self
    }
}

impl ComponentConfig {
    pub fn with_default_prop(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.default_props.insert(key.into(), value.into());
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(name.into());
        self
    }
}
