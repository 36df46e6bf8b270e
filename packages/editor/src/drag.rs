//! # Drag Sessions
//!
//! Turns drag events from the host's drag-and-drop layer into transitions.
//!
//! ```text
//!            drag start                     drag end
//!   Idle ──────────────────► Dragging ──────────────────► Idle
//!                             │    ▲
//!                   drag over │    │ Preview(insert | reorder | move)
//!                             └────┘
//! ```
//!
//! While dragging, every hover produces a `Preview` so the canvas shows the
//! drop result live without touching history. The dragged node is found by
//! id in the current indexes on every event, so previews never go stale.
//! A palette ("drawer") item is inserted once as a placeholder under the
//! drag source id and then moved like any other node.
//!
//! On drop, the node at its final position is committed with a `Replace`,
//! which also gives a placeholder its permanent id. A drop with no source
//! or no target is a cancel and puts back the document captured at drag
//! start.

use crate::action::{Action, DataUpdate, Transition};
use crate::state::PrivateAppState;
use pagecraft_common::{Data, IdGenerator, PropMap, ZoneId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// `type` carried by palette items that are not placed yet
pub const DRAWER_ITEM: &str = "drawer";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragData {
    /// Zone the draggable or droppable sits in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ZoneId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Component type of a drawer item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragDescriptor {
    pub id: String,

    #[serde(default)]
    pub data: DragData,
}

impl DragDescriptor {
    pub fn is_drawer_item(&self) -> bool {
        self.data.kind.as_deref() == Some(DRAWER_ITEM)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragOperation {
    #[serde(default)]
    pub source: Option<DragDescriptor>,

    #[serde(default)]
    pub target: Option<DragDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragEvent {
    pub operation: DragOperation,
}

impl DragEvent {
    pub fn new(source: Option<DragDescriptor>, target: Option<DragDescriptor>) -> Self {
        Self {
            operation: DragOperation { source, target },
        }
    }
}

#[derive(Debug, Clone)]
struct DragSession {
    source: DragDescriptor,

    /// Document when the drag started
    origin: Arc<Data>,

    /// Whether any preview was handed out
    previewed: bool,
}

#[derive(Debug, Clone, Default)]
enum DragPhase {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone, Default)]
pub struct DragCoordinator {
    phase: DragPhase,

    /// Draggable announced before the drag starts
    dragged_item: Option<DragDescriptor>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    /// Item about to be or being dragged
    pub fn dragged_item(&self) -> Option<&DragDescriptor> {
        match &self.phase {
            DragPhase::Dragging(session) => Some(&session.source),
            DragPhase::Idle => self.dragged_item.as_ref(),
        }
    }

    pub fn on_before_drag_start(&mut self, event: &DragEvent) {
        self.dragged_item = event.operation.source.clone();
    }

    pub fn on_drag_start(&mut self, event: &DragEvent, state: &PrivateAppState) {
        let source = event
            .operation
            .source
            .clone()
            .or_else(|| self.dragged_item.clone());

        let Some(source) = source else {
            debug!("Ignoring drag start without a source");
            return;
        };

        self.phase = DragPhase::Dragging(DragSession {
            source,
            origin: Arc::clone(&state.data),
            previewed: false,
        });
    }

    pub fn on_drag_over(&mut self, event: &DragEvent, state: &PrivateAppState) -> Option<Transition> {
        // Hover events can still arrive after the drop
        let DragPhase::Dragging(session) = &mut self.phase else {
            return None;
        };

        let source = event.operation.source.as_ref()?;
        let target = event.operation.target.as_ref()?;

        if target.id == session.source.id {
            return None;
        }

        let action = preview_action(state, &session.source, source, target)?;
        session.previewed = true;
        Some(Transition::Preview(action))
    }

    pub fn on_drag_end(
        &mut self,
        event: &DragEvent,
        state: &PrivateAppState,
        ids: &mut IdGenerator,
    ) -> Option<Transition> {
        let DragPhase::Dragging(session) = std::mem::take(&mut self.phase) else {
            return None;
        };
        self.dragged_item = None;

        if event.operation.source.is_none() || event.operation.target.is_none() {
            debug!(id = %session.source.id, "Drag cancelled");
            if session.previewed && !Arc::ptr_eq(&session.origin, &state.data) {
                let origin = (*session.origin).clone();
                return Some(Transition::Preview(Action::SetData {
                    data: DataUpdate::replace(origin),
                }));
            }
            return None;
        }

        let (zone, index) = state.indexes.locate(&session.source.id)?;
        let mut item = state.indexes.node(&session.source.id)?.flat_data.clone();

        if item.is_placeholder() {
            let indexes = &state.indexes;
            item.props.id = ids.unused_component_id(&item.component_type, |id| indexes.node(id).is_some());
            item.props.placeholder = false;
        } else if !session.previewed {
            return None;
        } else if *state.data == *session.origin {
            debug!(id = %session.source.id, "Drag ended where it started");
            return None;
        }

        Some(Transition::Commit(Action::Replace {
            destination_zone: zone,
            destination_index: index,
            data: item,
        }))
    }
}

/// Where a hover over `target` would drop the dragged node
fn drop_position(state: &PrivateAppState, target: &DragDescriptor, current: Option<&ZoneId>) -> Option<(ZoneId, usize)> {
    if let Some(zone) = ZoneId::from_target(&target.id) {
        let len = state.indexes.zone(&zone)?.content_ids.len();

        // End of the zone; the dragged node itself does not count when it
        // already sits there
        let index = if current == Some(&zone) {
            len.saturating_sub(1)
        } else {
            len
        };
        return Some((zone, index));
    }

    state.indexes.locate(&target.id).or_else(|| {
        let zone = target.data.group.clone()?;
        Some((zone, target.data.index?))
    })
}

fn preview_action(
    state: &PrivateAppState,
    dragged: &DragDescriptor,
    source: &DragDescriptor,
    target: &DragDescriptor,
) -> Option<Action> {
    let current = state.indexes.locate(&dragged.id);
    let (target_zone, target_index) = drop_position(state, target, current.as_ref().map(|(zone, _)| zone))?;

    let Some((zone, index)) = current else {
        if !dragged.is_drawer_item() {
            debug!(id = %dragged.id, "Dragged node is not in the document");
            return None;
        }

        let component_type = dragged
            .data
            .component_type
            .clone()
            .or_else(|| source.data.component_type.clone())?;

        let mut props = PropMap::new();
        props.insert("id".to_string(), Value::String(dragged.id.clone()));
        props.insert("__placeholder".to_string(), Value::Bool(true));

        return Some(Action::Insert {
            component_type,
            destination_zone: target_zone,
            destination_index: target_index,
            props: Some(props),
        });
    };

    if zone == target_zone {
        if index == target_index {
            return None;
        }
        Some(Action::Reorder {
            destination_zone: zone,
            source_index: index,
            destination_index: target_index,
        })
    } else {
        Some(Action::Move {
            source_zone: zone,
            source_index: index,
            destination_zone: target_zone,
            destination_index: target_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::Reducer;
    use crate::state::AppState;
    use pagecraft_common::{ComponentConfig, Config};
    use serde_json::json;

    fn config() -> Arc<Config> {
        Arc::new(
            Config::default()
                .with_component("Heading", ComponentConfig::default())
                .with_component("Columns", ComponentConfig::default()),
        )
    }

    fn state() -> PrivateAppState {
        let data: Data = serde_json::from_value(json!({
            "content": [
                { "type": "Heading", "props": { "id": "a" } },
                { "type": "Heading", "props": { "id": "b" } },
                { "type": "Columns", "props": { "id": "cols" } }
            ],
            "zones": { "cols:left": [] }
        }))
        .unwrap();

        PrivateAppState::new(
            AppState {
                data: Arc::new(data),
                ui: Arc::default(),
            },
            &config(),
        )
    }

    fn node(id: &str, zone: &str, index: usize) -> DragDescriptor {
        DragDescriptor {
            id: id.to_string(),
            data: DragData {
                group: Some(ZoneId::new(zone)),
                index: Some(index),
                ..DragData::default()
            },
        }
    }

    fn drawer(component_type: &str) -> DragDescriptor {
        DragDescriptor {
            id: "drawer-item".to_string(),
            data: DragData {
                kind: Some(DRAWER_ITEM.to_string()),
                component_type: Some(component_type.to_string()),
                ..DragData::default()
            },
        }
    }

    fn zone_target(zone: &str) -> DragDescriptor {
        DragDescriptor {
            id: format!("zone:{}", zone),
            data: DragData::default(),
        }
    }

    fn ids(state: &PrivateAppState, zone: &str) -> Vec<String> {
        state.indexes.zone(&ZoneId::new(zone)).unwrap().content_ids.clone()
    }

    #[test]
    fn test_drag_over_when_idle_is_ignored() {
        let mut drag = DragCoordinator::new();
        let event = DragEvent::new(Some(node("a", "root", 0)), Some(node("b", "root", 1)));
        assert!(drag.on_drag_over(&event, &state()).is_none());
    }

    #[test]
    fn test_same_zone_hover_reorders() {
        let start = state();
        let mut drag = DragCoordinator::new();
        let source = node("a", "root", 0);

        drag.on_drag_start(&DragEvent::new(Some(source.clone()), None), &start);
        assert!(drag.is_dragging());

        let transition = drag
            .on_drag_over(&DragEvent::new(Some(source), Some(node("cols", "root", 2))), &start)
            .unwrap();

        assert!(!transition.records_history());
        match transition.action() {
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
    }

    #[test]
    fn test_zone_hover_targets_end_of_zone() {
        let mut start = state();
        let mut reducer = Reducer::new(config(), IdGenerator::new("test"));

        let mut drag = DragCoordinator::new();
        let source = node("a", "root", 0);
        drag.on_drag_start(&DragEvent::new(Some(source.clone()), None), &start);

        let transition = drag
            .on_drag_over(&DragEvent::new(Some(source.clone()), Some(zone_target("cols:left"))), &start)
            .unwrap();
        assert!(matches!(
            transition.action(),
            Action::Move { destination_index: 0, .. }
        ));

        start = reducer.reduce(&start, transition.action());
        assert_eq!(ids(&start, "cols:left"), vec!["a"]);

        // Hovering the zone the node already sits in changes nothing
        let again = drag.on_drag_over(&DragEvent::new(Some(source), Some(zone_target("cols:left"))), &start);
        assert!(again.is_none());
    }

    #[test]
    fn test_drawer_item_inserts_placeholder_then_commits() {
        let mut reducer = Reducer::new(config(), IdGenerator::new("test"));
        let mut current = state();
        let mut drag = DragCoordinator::new();
        let source = drawer("Heading");

        drag.on_before_drag_start(&DragEvent::new(Some(source.clone()), None));
        assert_eq!(drag.dragged_item(), Some(&source));
        drag.on_drag_start(&DragEvent::new(None, None), &current);

        let insert = drag
            .on_drag_over(&DragEvent::new(Some(source.clone()), Some(node("b", "root", 1))), &current)
            .unwrap();
        current = reducer.reduce(&current, insert.action());
        assert_eq!(ids(&current, "root"), vec!["a", "drawer-item", "b", "cols"]);
        assert!(current.data.content[1].is_placeholder());

        // The placeholder now moves like any other node
        let moved = drag
            .on_drag_over(&DragEvent::new(Some(source.clone()), Some(zone_target("cols:left"))), &current)
            .unwrap();
        assert!(matches!(moved.action(), Action::Move { .. }));
        current = reducer.reduce(&current, moved.action());

        let end = DragEvent::new(Some(source), Some(zone_target("cols:left")));
        let commit = drag.on_drag_end(&end, &current, reducer.ids_mut()).unwrap();
        assert!(commit.records_history());
        current = reducer.reduce(&current, commit.action());

        let placed = ids(&current, "cols:left");
        assert_eq!(placed.len(), 1);
        assert_ne!(placed[0], "drawer-item");
        assert!(!current.data.zones[&ZoneId::new("cols:left")][0].is_placeholder());
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_cancelled_drag_restores_origin() {
        let mut reducer = Reducer::new(config(), IdGenerator::new("test"));
        let start = state();
        let mut drag = DragCoordinator::new();
        let source = node("a", "root", 0);

        drag.on_drag_start(&DragEvent::new(Some(source.clone()), None), &start);
        let preview = drag
            .on_drag_over(&DragEvent::new(Some(source.clone()), Some(node("b", "root", 1))), &start)
            .unwrap();
        let previewed = reducer.reduce(&start, preview.action());
        assert_eq!(ids(&previewed, "root"), vec!["b", "a", "cols"]);

        let cancel = drag
            .on_drag_end(&DragEvent::new(Some(source), None), &previewed, reducer.ids_mut())
            .unwrap();
        assert!(!cancel.records_history());

        let restored = reducer.reduce(&previewed, cancel.action());
        assert_eq!(ids(&restored, "root"), vec!["a", "b", "cols"]);
    }

    #[test]
    fn test_drop_without_movement_commits_nothing() {
        let start = state();
        let mut drag = DragCoordinator::new();
        let source = node("a", "root", 0);
        let mut ids = IdGenerator::new("test");

        drag.on_drag_start(&DragEvent::new(Some(source.clone()), None), &start);
        let end = DragEvent::new(Some(source.clone()), Some(source));
        assert!(drag.on_drag_end(&end, &start, &mut ids).is_none());
        assert!(!drag.is_dragging());
    }
}
