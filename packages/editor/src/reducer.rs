//! # State Reducer
//!
//! Applies one `Action` to a `PrivateAppState` and returns the next state.
//!
//! ## Design
//!
//! - Data actions flatten the document, edit the zone map, unflatten and
//!   re-index. The `ui` slice is shared with the previous state.
//! - Malformed targets (unknown zone, index out of range, unregistered
//!   type, duplicate id) are logged at `debug` and return the input state
//!   with both slices untouched, so callers can detect "no change" with
//!   `PrivateAppState::same_as`.
//! - Removing a node drops every zone it owned, transitively.
//! - Unregistered dropzones are parked in a cache and come back with their
//!   content on the next `RegisterZone`.

use crate::action::{Action, DataUpdate, UiUpdate};
use crate::flatten::{flatten, heal_ids, unflatten, FlatData, FlatZone};
use crate::indexes::build_indexes;
use crate::state::{AppState, ItemSelector, PrivateAppState, UiState};
use pagecraft_common::{ComponentData, Config, Data, IdGenerator, PropMap, Props, ZoneId, ZoneType};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub struct Reducer {
    config: Arc<Config>,
    ids: IdGenerator,

    /// Content of unregistered dropzones, keyed by zone
    zone_cache: BTreeMap<ZoneId, FlatZone>,
}

impl Reducer {
    pub fn new(config: Arc<Config>, ids: IdGenerator) -> Self {
        Self {
            config,
            ids,
            zone_cache: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ids_mut(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Zones currently parked by `UnregisterZone` or `park_zones`
    pub fn cached_zones(&self) -> impl Iterator<Item = &ZoneId> {
        self.zone_cache.keys()
    }

    /// Park zones removed outside the reducer (mount-time flush)
    pub fn park_zones(&mut self, zones: Vec<(ZoneId, FlatZone)>) {
        for (zone, flat) in zones {
            self.zone_cache.insert(zone, flat);
        }
    }

    pub fn reduce(&mut self, state: &PrivateAppState, action: &Action) -> PrivateAppState {
        match action {
            Action::Insert {
                component_type,
                destination_zone,
                destination_index,
                props,
            } => self.insert(
                state,
                component_type,
                destination_zone,
                *destination_index,
                props.as_ref(),
            ),
            Action::Reorder {
                destination_zone,
                source_index,
                destination_index,
            } => self.reorder(state, destination_zone, *source_index, *destination_index),
            Action::Move {
                source_zone,
                source_index,
                destination_zone,
                destination_index,
            } => self.move_node(
                state,
                source_zone,
                *source_index,
                destination_zone,
                *destination_index,
            ),
            Action::Replace {
                destination_zone,
                destination_index,
                data,
            } => self.replace(state, destination_zone, *destination_index, data),
            Action::Remove { zone, index } => self.remove(state, zone, *index),
            Action::Duplicate {
                source_zone,
                source_index,
            } => self.duplicate(state, source_zone, *source_index),
            Action::SetUi { ui } => self.set_ui(state, ui),
            Action::SetData { data } => self.set_data(state, data),
            Action::RegisterZone { zone } => self.register_zone(state, zone),
            Action::UnregisterZone { zone } => self.unregister_zone(state, zone),
            Action::Set { state: next } => self.set(state, next),
        }
    }

    fn insert(
        &mut self,
        state: &PrivateAppState,
        component_type: &str,
        zone: &ZoneId,
        index: usize,
        props: Option<&PropMap>,
    ) -> PrivateAppState {
        let Some(component_config) = self.config.component(component_type) else {
            debug!(component_type, "Ignoring insert of unregistered component type");
            return state.clone();
        };

        if state.indexes.zone(zone).is_none() {
            debug!(zone = %zone, "Ignoring insert into unregistered zone");
            return state.clone();
        }

        let mut fields = component_config.default_props.clone();
        let mut id = None;
        let mut placeholder = false;

        for (key, value) in props.into_iter().flatten() {
            match key.as_str() {
                "id" => id = value.as_str().filter(|id| !id.is_empty()).map(str::to_string),
                "__placeholder" => placeholder = value.as_bool().unwrap_or(false),
                _ => {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }

        fields.remove("id");
        fields.remove("__placeholder");
        for slot in &component_config.slots {
            fields
                .entry(slot.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
        }

        let id = match id {
            Some(id) => id,
            None => {
                let indexes = &state.indexes;
                self.ids
                    .unused_component_id(component_type, |id| indexes.node(id).is_some())
            }
        };

        if state.indexes.node(&id).is_some() {
            debug!(id = %id, "Ignoring insert of an id that is already placed");
            return state.clone();
        }

        let component = ComponentData {
            component_type: component_type.to_string(),
            props: Props {
                id,
                placeholder,
                fields,
            },
        };

        let mut flat = flatten(&state.data, &self.config);
        if flat.adopt(&component, zone, index, &self.config).is_none() {
            return state.clone();
        }

        // Slot content passed in props must not reuse placed ids
        if let Some(duplicate) = flat.first_duplicate_id() {
            debug!(id = %duplicate, "Ignoring insert whose slot content reuses a placed id");
            return state.clone();
        }

        self.with_flat(state, &flat)
    }

    fn reorder(
        &mut self,
        state: &PrivateAppState,
        zone: &ZoneId,
        source: usize,
        destination: usize,
    ) -> PrivateAppState {
        let mut flat = flatten(&state.data, &self.config);

        let Some(items) = flat.zones.get_mut(zone).map(|zone| &mut zone.items) else {
            debug!(zone = %zone, "Ignoring reorder in unregistered zone");
            return state.clone();
        };

        if source >= items.len() {
            debug!(zone = %zone, source, "Ignoring reorder of out-of-range index");
            return state.clone();
        }

        let destination = destination.min(items.len() - 1);
        if source == destination {
            return state.clone();
        }

        let item = items.remove(source);
        items.insert(destination, item);

        self.with_flat(state, &flat)
    }

    fn move_node(
        &mut self,
        state: &PrivateAppState,
        source_zone: &ZoneId,
        source: usize,
        destination_zone: &ZoneId,
        destination: usize,
    ) -> PrivateAppState {
        if source_zone == destination_zone {
            return self.reorder(state, destination_zone, source, destination);
        }

        let Some(id) = node_at(state, source_zone, source) else {
            debug!(zone = %source_zone, source, "Ignoring move of a missing node");
            return state.clone();
        };

        if state.indexes.zone(destination_zone).is_none() {
            debug!(zone = %destination_zone, "Ignoring move into unregistered zone");
            return state.clone();
        }

        // A node cannot move into one of its own zones
        let owner = destination_zone.parent();
        let inside_itself = owner == id
            || state
                .indexes
                .node(owner)
                .map_or(false, |node| node.path.iter().any(|ancestor| ancestor == &id));
        if inside_itself {
            debug!(id = %id, zone = %destination_zone, "Ignoring move of a node into itself");
            return state.clone();
        }

        let mut flat = flatten(&state.data, &self.config);
        let Some(node) = flat
            .zones
            .get_mut(source_zone)
            .map(|zone| zone.items.remove(source))
        else {
            return state.clone();
        };

        let Some(target) = flat.zones.get_mut(destination_zone) else {
            return state.clone();
        };
        let destination = destination.min(target.items.len());
        target.items.insert(destination, node);

        self.with_flat(state, &flat)
    }

    fn replace(
        &mut self,
        state: &PrivateAppState,
        zone: &ZoneId,
        index: usize,
        data: &ComponentData,
    ) -> PrivateAppState {
        let Some(old_id) = node_at(state, zone, index) else {
            debug!(zone = %zone, index, "Ignoring replace of a missing node");
            return state.clone();
        };

        let new_id = data.id().to_string();
        if new_id.is_empty() || (new_id != old_id && state.indexes.node(&new_id).is_some()) {
            debug!(id = %new_id, "Ignoring replace with an empty or already placed id");
            return state.clone();
        }

        let mut flat = flatten(&state.data, &self.config);
        let Some(target) = flat.zones.get_mut(zone) else {
            return state.clone();
        };
        target.items.remove(index);

        // Slot zones come back from the new node's own props
        let owned: Vec<(ZoneId, ZoneType)> = flat
            .zones_of(&old_id)
            .map(|(zone, flat)| (zone.clone(), flat.kind))
            .collect();

        for (owned_zone, kind) in owned {
            let Some(content) = flat.zones.remove(&owned_zone) else {
                continue;
            };
            if kind == ZoneType::Dropzone {
                flat.zones
                    .insert(ZoneId::compound(&new_id, owned_zone.name()), content);
            }
        }

        if flat.adopt(data, zone, index, &self.config).is_none() {
            return state.clone();
        }
        flat.prune_unreachable();

        // Nested ids may only come back from the replaced node's own slots
        if let Some(duplicate) = flat.first_duplicate_id() {
            debug!(id = %duplicate, "Ignoring replace whose slot content reuses a placed id");
            return state.clone();
        }

        self.with_flat(state, &flat)
    }

    fn remove(&mut self, state: &PrivateAppState, zone: &ZoneId, index: usize) -> PrivateAppState {
        let Some(id) = node_at(state, zone, index) else {
            debug!(zone = %zone, index, "Ignoring remove of a missing node");
            return state.clone();
        };

        let mut flat = flatten(&state.data, &self.config);
        let removed_ids = flat.subtree_ids(&id);
        let Some(target) = flat.zones.get_mut(zone) else {
            return state.clone();
        };
        target.items.remove(index);
        flat.prune_unreachable();
        self.evict_cached(removed_ids);

        let mut next = self.with_flat(state, &flat);

        let removed = ItemSelector::new(zone.clone(), index);
        if state.ui.item_selector.as_ref() == Some(&removed) {
            next.ui = Arc::new(UiState {
                item_selector: None,
                ..(*state.ui).clone()
            });
        }

        next
    }

    /// Drop parked zones owned by removed nodes, including zones parked
    /// under nodes that only live in the cache
    fn evict_cached(&mut self, mut removed: HashSet<String>) {
        loop {
            let evicted: Vec<ZoneId> = self
                .zone_cache
                .keys()
                .filter(|zone| removed.contains(zone.parent()))
                .cloned()
                .collect();
            if evicted.is_empty() {
                return;
            }

            for zone in evicted {
                if let Some(content) = self.zone_cache.remove(&zone) {
                    debug!(zone = %zone, "Evicting parked zone of a removed node");
                    removed.extend(content.items.into_iter().map(|item| item.props.id));
                }
            }
        }
    }

    fn duplicate(&mut self, state: &PrivateAppState, zone: &ZoneId, index: usize) -> PrivateAppState {
        let Some(id) = node_at(state, zone, index) else {
            debug!(zone = %zone, index, "Ignoring duplicate of a missing node");
            return state.clone();
        };

        let mut flat = flatten(&state.data, &self.config);
        let subtree = flat.subtree_ids(&id);

        let Some(original) = flat.zones.get(zone).and_then(|z| z.items.get(index)).cloned() else {
            return state.clone();
        };

        // Fresh ids for the node and everything nested in it
        let mut renamed: HashMap<String, String> = HashMap::new();
        let indexes = Arc::clone(&state.indexes);
        let taken = |id: &str| indexes.node(id).is_some();
        renamed.insert(id.clone(), self.ids.unused_component_id(&original.component_type, taken));

        let owned: Vec<(ZoneId, FlatZone)> = flat
            .zones
            .iter()
            .filter(|(zone, _)| subtree.contains(zone.parent()))
            .map(|(zone, content)| (zone.clone(), content.clone()))
            .collect();

        for (_, content) in &owned {
            for item in &content.items {
                if !renamed.contains_key(item.id()) {
                    let fresh = self.ids.unused_component_id(&item.component_type, taken);
                    renamed.insert(item.props.id.clone(), fresh);
                }
            }
        }

        for (owned_zone, content) in owned {
            let Some(owner) = renamed.get(owned_zone.parent()) else {
                continue;
            };
            let copy = FlatZone {
                kind: content.kind,
                items: content
                    .items
                    .iter()
                    .map(|item| copy_node(item, &renamed, &self.config))
                    .collect(),
            };
            flat.zones
                .insert(ZoneId::compound(owner, owned_zone.name()), copy);
        }

        let copy = copy_node(&original, &renamed, &self.config);
        if let Some(target) = flat.zones.get_mut(zone) {
            target.items.insert(index + 1, copy);
        }

        let mut next = self.with_flat(state, &flat);
        next.ui = Arc::new(UiState {
            item_selector: Some(ItemSelector::new(zone.clone(), index + 1)),
            ..(*state.ui).clone()
        });
        next
    }

    fn set_ui(&mut self, state: &PrivateAppState, update: &UiUpdate) -> PrivateAppState {
        let ui = update.apply(&state.ui);
        if ui == *state.ui {
            return state.clone();
        }

        PrivateAppState {
            data: Arc::clone(&state.data),
            ui: Arc::new(ui),
            indexes: Arc::clone(&state.indexes),
        }
    }

    fn set_data(&mut self, state: &PrivateAppState, update: &DataUpdate) -> PrivateAppState {
        let mut data = update.apply(&state.data);
        heal_ids(&mut data, &self.config, &mut self.ids);

        if data == *state.data {
            return state.clone();
        }

        self.with_data(state, data)
    }

    fn register_zone(&mut self, state: &PrivateAppState, zone: &ZoneId) -> PrivateAppState {
        if zone.is_root() || state.indexes.zone(zone).is_some() {
            return state.clone();
        }

        if state.indexes.node(zone.parent()).is_none() {
            debug!(zone = %zone, "Ignoring registration of a zone with no owner");
            return state.clone();
        }

        let mut flat = flatten(&state.data, &self.config);
        let mut placed: HashSet<String> = state.indexes.nodes.keys().cloned().collect();
        self.restore_zone(&mut flat, zone, &mut placed);

        self.with_flat(state, &flat)
    }

    /// Bring a zone back from the cache (or create it empty), along with
    /// any cached zones owned by the restored nodes
    fn restore_zone(&mut self, flat: &mut FlatData, zone: &ZoneId, placed: &mut HashSet<String>) {
        let mut restored = self
            .zone_cache
            .remove(zone)
            .unwrap_or_else(|| FlatZone::new(ZoneType::Dropzone));

        restored.items.retain(|item| placed.insert(item.props.id.clone()));

        let owners: Vec<ComponentData> = restored.items.clone();
        flat.zones.insert(zone.clone(), restored);

        for owner in owners {
            let nested: Vec<ZoneId> = self
                .zone_cache
                .keys()
                .filter(|cached| cached.parent() == owner.id())
                .cloned()
                .collect();

            for nested_zone in nested {
                if !flat.zones.contains_key(&nested_zone) {
                    self.restore_zone(flat, &nested_zone, placed);
                }
            }

            for slot in self.config.slots(&owner.component_type) {
                flat.zones
                    .entry(ZoneId::compound(owner.id(), slot))
                    .or_insert_with(|| FlatZone::new(ZoneType::Slot));
            }
        }
    }

    fn unregister_zone(&mut self, state: &PrivateAppState, zone: &ZoneId) -> PrivateAppState {
        match state.indexes.zone(zone) {
            Some(record) if record.kind == ZoneType::Dropzone => {}
            _ => {
                debug!(zone = %zone, "Ignoring unregistration of a zone that is not a dropzone");
                return state.clone();
            }
        }

        let mut flat = flatten(&state.data, &self.config);
        let Some(content) = flat.zones.remove(zone) else {
            return state.clone();
        };

        self.zone_cache.insert(zone.clone(), content);
        let orphaned = flat.prune_unreachable();
        self.park_zones(orphaned);

        self.with_flat(state, &flat)
    }

    fn set(&mut self, state: &PrivateAppState, next: &AppState) -> PrivateAppState {
        let same_data = Arc::ptr_eq(&state.data, &next.data);
        let same_ui = Arc::ptr_eq(&state.ui, &next.ui);

        if same_data && same_ui {
            return state.clone();
        }

        let indexes = if same_data {
            Arc::clone(&state.indexes)
        } else {
            Arc::new(build_indexes(&next.data, &self.config))
        };

        PrivateAppState {
            data: Arc::clone(&next.data),
            ui: Arc::clone(&next.ui),
            indexes,
        }
    }

    fn with_flat(&self, state: &PrivateAppState, flat: &FlatData) -> PrivateAppState {
        self.with_data(state, unflatten(flat))
    }

    fn with_data(&self, state: &PrivateAppState, data: Data) -> PrivateAppState {
        let indexes = build_indexes(&data, &self.config);
        PrivateAppState {
            data: Arc::new(data),
            ui: Arc::clone(&state.ui),
            indexes: Arc::new(indexes),
        }
    }
}

/// Id of the node at a zone position
fn node_at(state: &PrivateAppState, zone: &ZoneId, index: usize) -> Option<String> {
    state.indexes.zone(zone)?.content_ids.get(index).cloned()
}

/// Copy a shallow node with renamed ids, pointing slot props at the
/// renamed slot zones
fn copy_node(node: &ComponentData, renamed: &HashMap<String, String>, config: &Config) -> ComponentData {
    let mut copy = node.clone();
    if let Some(id) = renamed.get(node.id()) {
        copy.props.id = id.clone();
    }
    copy.props.placeholder = false;

    for slot in config.slots(&node.component_type) {
        copy.props.fields.insert(
            slot.clone(),
            Value::String(ZoneId::compound(copy.id(), slot).to_string()),
        );
    }

    copy
}
