//! # Application State
//!
//! `AppState` is two slices dispatched together: the persisted document
//! (`data`) and non-persisted editing state (`ui`). Each slice sits behind
//! an `Arc`, so a transition that leaves a slice untouched shares it with
//! the previous state and with history snapshots.

use crate::indexes::{build_indexes, Indexes};
use pagecraft_common::{Category, ComponentData, Config, Data, PropMap, ZoneId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Viewport widths at or below this hide both sidebars on mount
pub const NARROW_VIEWPORT_MAX: u32 = 638;

/// Locator of a placed component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSelector {
    pub index: usize,

    #[serde(default = "ZoneId::root")]
    pub zone: ZoneId,
}

impl ItemSelector {
    pub fn new(zone: impl Into<ZoneId>, index: usize) -> Self {
        Self {
            index,
            zone: zone.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightKeyword {
    #[serde(rename = "auto")]
    Auto,
}

/// Viewport height in pixels or `"auto"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewportHeight {
    Px(u32),
    Keyword(HeightKeyword),
}

impl ViewportHeight {
    pub fn auto() -> Self {
        ViewportHeight::Keyword(HeightKeyword::Auto)
    }
}

impl Default for ViewportHeight {
    fn default() -> Self {
        Self::auto()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,

    #[serde(default)]
    pub height: ViewportHeight,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Viewport {
    fn named(width: u32, label: &str, icon: &str) -> Self {
        Self {
            width,
            height: ViewportHeight::auto(),
            label: Some(label.to_string()),
            icon: Some(icon.to_string()),
        }
    }
}

pub fn default_viewports() -> Vec<Viewport> {
    vec![
        Viewport::named(360, "Small", "Smartphone"),
        Viewport::named(768, "Medium", "Tablet"),
        Viewport::named(1280, "Large", "Monitor"),
    ]
}

/// Viewport whose width is nearest to the host width
pub fn closest_viewport(width: u32, viewports: &[Viewport]) -> Option<&Viewport> {
    viewports
        .iter()
        .min_by_key(|viewport| viewport.width.abs_diff(width))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentViewport {
    pub width: u32,
    pub height: ViewportHeight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportState {
    pub current: CurrentViewport,
    pub controls_visible: bool,
    pub options: Vec<Viewport>,
}

impl Default for ViewportState {
    fn default() -> Self {
        let first = default_viewports().remove(0);
        Self {
            current: CurrentViewport {
                width: first.width,
                height: ViewportHeight::auto(),
            },
            controls_visible: true,
            options: Vec::new(),
        }
    }
}

/// Palette category as shown in the component list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentListEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub components: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl From<&Category> for ComponentListEntry {
    fn from(category: &Category) -> Self {
        Self {
            title: category.title.clone(),
            components: category.components.clone(),
            expanded: category.default_expanded,
            visible: category.visible,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub focus: Option<String>,
}

/// Non-persisted editing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    pub left_side_bar_visible: bool,
    pub right_side_bar_visible: bool,
    pub item_selector: Option<ItemSelector>,
    pub component_list: BTreeMap<String, ComponentListEntry>,
    pub viewports: ViewportState,
    pub field: FieldState,

    /// Opaque per-field array editor state owned by the field renderers
    pub array_state: PropMap,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            left_side_bar_visible: true,
            right_side_bar_visible: true,
            item_selector: None,
            component_list: BTreeMap::new(),
            viewports: ViewportState::default(),
            field: FieldState::default(),
            array_state: PropMap::new(),
        }
    }
}

/// Partial `UiState`; present fields replace the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_side_bar_visible: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_side_bar_visible: Option<bool>,

    /// `Some(None)` clears the selection
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_selector: Option<Option<ItemSelector>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_list: Option<BTreeMap<String, ComponentListEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewports: Option<ViewportState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_state: Option<PropMap>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl UiPatch {
    /// Shallow merge onto `ui`
    pub fn apply(&self, ui: &UiState) -> UiState {
        let mut next = ui.clone();

        if let Some(visible) = self.left_side_bar_visible {
            next.left_side_bar_visible = visible;
        }
        if let Some(visible) = self.right_side_bar_visible {
            next.right_side_bar_visible = visible;
        }
        if let Some(selector) = &self.item_selector {
            next.item_selector = selector.clone();
        }
        if let Some(list) = &self.component_list {
            next.component_list = list.clone();
        }
        if let Some(viewports) = &self.viewports {
            next.viewports = viewports.clone();
        }
        if let Some(field) = &self.field {
            next.field = field.clone();
        }
        if let Some(array_state) = &self.array_state {
            next.array_state = array_state.clone();
        }

        next
    }
}

/// Public application state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub data: Arc<Data>,
    pub ui: Arc<UiState>,
}

/// Application state plus the derived indexes
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateAppState {
    pub data: Arc<Data>,
    pub ui: Arc<UiState>,
    pub indexes: Arc<Indexes>,
}

impl PrivateAppState {
    /// Index a fresh state
    pub fn new(app: AppState, config: &Config) -> Self {
        let indexes = build_indexes(&app.data, config);
        Self {
            data: app.data,
            ui: app.ui,
            indexes: Arc::new(indexes),
        }
    }

    /// Public view, sharing both slices
    pub fn app_state(&self) -> AppState {
        AppState {
            data: Arc::clone(&self.data),
            ui: Arc::clone(&self.ui),
        }
    }

    /// True when `other` is this state with no slice replaced
    pub fn same_as(&self, other: &PrivateAppState) -> bool {
        Arc::ptr_eq(&self.data, &other.data) && Arc::ptr_eq(&self.ui, &other.ui)
    }
}

/// Component at a locator, with slot content inlined
pub fn get_item<'a>(selector: &ItemSelector, state: &'a PrivateAppState) -> Option<&'a ComponentData> {
    let id = state
        .indexes
        .zone(&selector.zone)?
        .content_ids
        .get(selector.index)?;

    state.indexes.node(id).map(|node| &node.flat_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_ui() {
        let ui = UiState::default();
        assert!(ui.left_side_bar_visible);
        assert!(ui.right_side_bar_visible);
        assert_eq!(ui.item_selector, None);
        assert_eq!(ui.viewports.current.width, 360);
        assert_eq!(ui.viewports.current.height, ViewportHeight::auto());
        assert!(ui.viewports.controls_visible);
    }

    #[test]
    fn test_viewport_height_serialization() {
        assert_eq!(serde_json::to_value(ViewportHeight::auto()).unwrap(), json!("auto"));
        assert_eq!(serde_json::to_value(ViewportHeight::Px(600)).unwrap(), json!(600));

        let parsed: ViewportHeight = serde_json::from_value(json!("auto")).unwrap();
        assert_eq!(parsed, ViewportHeight::auto());
    }

    #[test]
    fn test_closest_viewport() {
        let viewports = default_viewports();
        assert_eq!(closest_viewport(400, &viewports).unwrap().width, 360);
        assert_eq!(closest_viewport(1000, &viewports).unwrap().width, 768);
        assert_eq!(closest_viewport(1920, &viewports).unwrap().width, 1280);
        assert!(closest_viewport(1920, &[]).is_none());
    }

    #[test]
    fn test_patch_merges_shallowly() {
        let ui = UiState {
            item_selector: Some(ItemSelector::new("root", 2)),
            ..UiState::default()
        };

        let patch: UiPatch = serde_json::from_value(json!({ "leftSideBarVisible": false })).unwrap();
        let next = patch.apply(&ui);
        assert!(!next.left_side_bar_visible);
        assert!(next.right_side_bar_visible);
        assert_eq!(next.item_selector, Some(ItemSelector::new("root", 2)));

        let clear: UiPatch = serde_json::from_value(json!({ "itemSelector": null })).unwrap();
        assert_eq!(clear.item_selector, Some(None));
        assert_eq!(clear.apply(&ui).item_selector, None);
    }

    #[test]
    fn test_item_selector_zone_defaults_to_root() {
        let selector: ItemSelector = serde_json::from_value(json!({ "index": 0 })).unwrap();
        assert_eq!(selector.zone, ZoneId::root());
    }

    #[test]
    fn test_get_item() {
        let data: Data = serde_json::from_value(json!({
            "content": [ { "type": "Heading", "props": { "id": "h" } } ]
        }))
        .unwrap();
        let state = PrivateAppState::new(
            AppState {
                data: Arc::new(data),
                ui: Arc::default(),
            },
            &Config::default(),
        );

        assert_eq!(get_item(&ItemSelector::new("root", 0), &state).unwrap().id(), "h");
        assert!(get_item(&ItemSelector::new("root", 1), &state).is_none());
        assert!(get_item(&ItemSelector::new("nowhere:zone", 0), &state).is_none());
    }
}
