//! # Actions
//!
//! Discrete state transitions understood by the reducer.
//!
//! ## Preview vs Commit
//!
//! Every dispatch is a `Transition`: either a `Preview`, which changes state
//! without touching history (drag-over reordering, zone registration), or a
//! `Commit`, which is recorded as an undo step. Each action has a default
//! category; callers pick the other one explicitly when needed.
//!
//! ```text
//! Insert / Reorder / Move / Replace / Remove / Duplicate / SetData   → Commit
//! SetUi / RegisterZone / UnregisterZone / Set                         → Preview
//! ```

use crate::state::{AppState, UiPatch, UiState};
use pagecraft_common::{ComponentData, Content, Data, PropMap, RootData, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type UiFn = Arc<dyn Fn(&UiState) -> UiState + Send + Sync>;
pub type DataFn = Arc<dyn Fn(&Data) -> Data + Send + Sync>;

/// New `ui` as a patch, or as a function of the current `ui`
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiUpdate {
    Patch(UiPatch),

    #[serde(skip)]
    With(UiFn),
}

impl UiUpdate {
    pub fn with(f: impl Fn(&UiState) -> UiState + Send + Sync + 'static) -> Self {
        UiUpdate::With(Arc::new(f))
    }

    pub fn apply(&self, ui: &UiState) -> UiState {
        match self {
            UiUpdate::Patch(patch) => patch.apply(ui),
            UiUpdate::With(f) => f(ui),
        }
    }
}

impl fmt::Debug for UiUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiUpdate::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            UiUpdate::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

impl From<UiPatch> for UiUpdate {
    fn from(patch: UiPatch) -> Self {
        UiUpdate::Patch(patch)
    }
}

/// Partial document; present fields replace the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<RootData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<BTreeMap<ZoneId, Content>>,
}

/// New `data` as a patch, or as a function of the current `data`
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataUpdate {
    Patch(DataPatch),

    #[serde(skip)]
    With(DataFn),
}

impl DataUpdate {
    /// Replace the whole document
    pub fn replace(data: Data) -> Self {
        DataUpdate::Patch(DataPatch {
            root: Some(data.root),
            content: Some(data.content),
            zones: Some(data.zones),
        })
    }

    pub fn with(f: impl Fn(&Data) -> Data + Send + Sync + 'static) -> Self {
        DataUpdate::With(Arc::new(f))
    }

    pub fn apply(&self, data: &Data) -> Data {
        match self {
            DataUpdate::Patch(patch) => {
                let mut next = data.clone();
                if let Some(root) = &patch.root {
                    next.root = root.clone();
                }
                if let Some(content) = &patch.content {
                    next.content = content.clone();
                }
                if let Some(zones) = &patch.zones {
                    next.zones = zones.clone();
                }
                next
            }
            DataUpdate::With(f) => f(data),
        }
    }
}

impl fmt::Debug for DataUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataUpdate::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            DataUpdate::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Reducer actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Place a new component of a registered type
    #[serde(rename_all = "camelCase")]
    Insert {
        component_type: String,
        destination_zone: ZoneId,
        destination_index: usize,
        /// May carry `id` and `__placeholder`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        props: Option<PropMap>,
    },

    /// Move an element within one zone
    #[serde(rename_all = "camelCase")]
    Reorder {
        destination_zone: ZoneId,
        source_index: usize,
        destination_index: usize,
    },

    /// Move an element between zones
    #[serde(rename_all = "camelCase")]
    Move {
        source_zone: ZoneId,
        source_index: usize,
        destination_zone: ZoneId,
        destination_index: usize,
    },

    /// Overwrite the element at a position
    #[serde(rename_all = "camelCase")]
    Replace {
        destination_zone: ZoneId,
        destination_index: usize,
        data: ComponentData,
    },

    /// Delete an element and everything nested in it
    Remove { zone: ZoneId, index: usize },

    /// Copy an element, with fresh ids, right after the original
    #[serde(rename_all = "camelCase")]
    Duplicate {
        source_zone: ZoneId,
        source_index: usize,
    },

    SetUi { ui: UiUpdate },

    SetData { data: DataUpdate },

    RegisterZone { zone: ZoneId },

    UnregisterZone { zone: ZoneId },

    /// Restore a whole state (undo/redo)
    Set { state: AppState },
}

impl Action {
    /// Whether this action is recorded in history unless told otherwise
    pub fn commits_by_default(&self) -> bool {
        match self {
            Action::Insert { .. }
            | Action::Reorder { .. }
            | Action::Move { .. }
            | Action::Replace { .. }
            | Action::Remove { .. }
            | Action::Duplicate { .. }
            | Action::SetData { .. } => true,

            Action::SetUi { .. }
            | Action::RegisterZone { .. }
            | Action::UnregisterZone { .. }
            | Action::Set { .. } => false,
        }
    }

    /// Debug name
    pub fn name(&self) -> &'static str {
        match self {
            Action::Insert { .. } => "insert",
            Action::Reorder { .. } => "reorder",
            Action::Move { .. } => "move",
            Action::Replace { .. } => "replace",
            Action::Remove { .. } => "remove",
            Action::Duplicate { .. } => "duplicate",
            Action::SetUi { .. } => "setUi",
            Action::SetData { .. } => "setData",
            Action::RegisterZone { .. } => "registerZone",
            Action::UnregisterZone { .. } => "unregisterZone",
            Action::Set { .. } => "set",
        }
    }
}

/// A dispatch: an action plus whether it is recorded in history
#[derive(Debug, Clone)]
pub enum Transition {
    Preview(Action),
    Commit(Action),
}

impl Transition {
    pub fn action(&self) -> &Action {
        match self {
            Transition::Preview(action) | Transition::Commit(action) => action,
        }
    }

    pub fn records_history(&self) -> bool {
        matches!(self, Transition::Commit(_))
    }
}

impl From<Action> for Transition {
    fn from(action: Action) -> Self {
        if action.commits_by_default() {
            Transition::Commit(action)
        } else {
            Transition::Preview(action)
        }
    }
}

/// Wire shape of a dispatch: an action with an optional `recordHistory`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedAction {
    #[serde(flatten)]
    pub action: Action,

    #[serde(
        rename = "recordHistory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub record_history: Option<bool>,
}

impl From<ScriptedAction> for Transition {
    fn from(scripted: ScriptedAction) -> Self {
        match scripted.record_history {
            Some(true) => Transition::Commit(scripted.action),
            Some(false) => Transition::Preview(scripted.action),
            None => Transition::from(scripted.action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_categories() {
        let insert = Action::Insert {
            component_type: "Heading".to_string(),
            destination_zone: ZoneId::root(),
            destination_index: 0,
            props: None,
        };
        assert!(Transition::from(insert).records_history());

        let register = Action::RegisterZone {
            zone: ZoneId::new("a:b"),
        };
        assert!(!Transition::from(register).records_history());

        let set_data = Action::SetData {
            data: DataUpdate::replace(Data::default()),
        };
        assert!(Transition::from(set_data).records_history());
    }

    #[test]
    fn test_scripted_action_parsing() {
        let scripted: ScriptedAction = serde_json::from_value(json!({
            "type": "reorder",
            "destinationZone": "root",
            "sourceIndex": 0,
            "destinationIndex": 2,
            "recordHistory": false
        }))
        .unwrap();

        match &scripted.action {
            Action::Reorder {
                source_index,
                destination_index,
                ..
            } => {
                assert_eq!(*source_index, 0);
                assert_eq!(*destination_index, 2);
            }
            other => panic!("unexpected action {:?}", other),
        }

        assert!(!Transition::from(scripted).records_history());
    }

    #[test]
    fn test_set_ui_patch_parsing() {
        let scripted: ScriptedAction = serde_json::from_value(json!({
            "type": "setUi",
            "ui": { "leftSideBarVisible": false },
            "recordHistory": true
        }))
        .unwrap();

        assert_eq!(scripted.action.name(), "setUi");
        let transition = Transition::from(scripted);
        assert!(transition.records_history());

        if let Action::SetUi { ui } = transition.action() {
            assert!(!ui.apply(&UiState::default()).left_side_bar_visible);
        } else {
            panic!("expected setUi");
        }
    }

    #[test]
    fn test_ui_update_function() {
        let toggle = UiUpdate::with(|ui| UiState {
            left_side_bar_visible: !ui.left_side_bar_visible,
            ..ui.clone()
        });

        let ui = UiState::default();
        assert!(!toggle.apply(&ui).left_side_bar_visible);
        assert_eq!(format!("{:?}", toggle), "With(<fn>)");
    }

    #[test]
    fn test_data_patch_keeps_missing_fields() {
        let data = Data {
            content: vec![ComponentData::new("Heading", "h")],
            ..Data::default()
        };

        let patch = DataUpdate::Patch(DataPatch {
            root: Some(RootData::default()),
            ..DataPatch::default()
        });
        assert_eq!(patch.apply(&data).content.len(), 1);

        let replace = DataUpdate::replace(Data::default());
        assert!(replace.apply(&data).content.is_empty());
    }
}
