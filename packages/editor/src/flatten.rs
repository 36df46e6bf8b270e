//! # Zone Flattening
//!
//! Converts between the stored document and a uniform zone map.
//!
//! ```text
//! Data                                   FlatData
//! ├── content        ───────────────►    zones["root"]          (Root)
//! ├── zones["A:col"] ───────────────►    zones["A:col"]         (Dropzone)
//! └── A.props.items  ───────────────►    zones["A:items"]       (Slot)
//!                                        A.props.items = "A:items"
//! ```
//!
//! Nodes in a `FlatData` are shallow: each declared slot prop holds the
//! compound id of its zone instead of the child content. `unflatten`
//! re-embeds slot content and is the exact inverse for well-formed input.

use pagecraft_common::{
    walk_component, walk_component_mut, walk_zone, ComponentData, Config, Content, Data,
    IdGenerator, RootData, Visitor, VisitorMut, ZoneId, ZoneType, ROOT_ID,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// One zone's shallow children
#[derive(Debug, Clone, PartialEq)]
pub struct FlatZone {
    pub kind: ZoneType,
    pub items: Vec<ComponentData>,
}

impl FlatZone {
    pub fn new(kind: ZoneType) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }
}

/// Document normalized into a single zone map
#[derive(Debug, Clone, PartialEq)]
pub struct FlatData {
    pub root: RootData,
    pub zones: BTreeMap<ZoneId, FlatZone>,
}

impl FlatData {
    /// Zones owned by a node, in key order
    pub fn zones_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = (&'a ZoneId, &'a FlatZone)> + 'a {
        self.zones
            .iter()
            .filter(move |(zone, _)| zone.parent() == parent)
    }

    /// Flatten a full component into `zone` at `index` (clamped), adding
    /// the zones of its slots. Returns the shallow node that was placed.
    pub fn adopt(&mut self, component: &ComponentData, zone: &ZoneId, index: usize, config: &Config) -> Option<&ComponentData> {
        if !self.zones.contains_key(zone) {
            return None;
        }

        let mut flattener = Flattener::default();
        flattener.visit_component(component, zone, 0, config);

        let placed = flattener.zones.remove(zone)?.items.into_iter().next()?;

        for (child_zone, child) in flattener.zones {
            self.zones.insert(child_zone, child);
        }

        let target = self.zones.get_mut(zone)?;
        let index = index.min(target.items.len());
        target.items.insert(index, placed);
        target.items.get(index)
    }

    /// Ids of every node reachable from the root node
    pub fn reachable_ids(&self) -> HashSet<String> {
        let mut reachable: HashSet<String> = HashSet::new();
        reachable.insert(ROOT_ID.to_string());
        let mut frontier = vec![ROOT_ID.to_string()];

        while let Some(id) = frontier.pop() {
            for (_, zone) in self.zones_of(&id) {
                for item in &zone.items {
                    if reachable.insert(item.props.id.clone()) {
                        frontier.push(item.props.id.clone());
                    }
                }
            }
        }

        reachable
    }

    /// Ids of `id` and everything nested beneath it
    pub fn subtree_ids(&self, id: &str) -> HashSet<String> {
        let mut ids: HashSet<String> = HashSet::new();
        ids.insert(id.to_string());
        let mut frontier = vec![id.to_string()];

        while let Some(current) = frontier.pop() {
            for (_, zone) in self.zones_of(&current) {
                for item in &zone.items {
                    if ids.insert(item.props.id.clone()) {
                        frontier.push(item.props.id.clone());
                    }
                }
            }
        }

        ids
    }

    /// First id placed more than once across all zones
    pub fn first_duplicate_id(&self) -> Option<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.zones
            .values()
            .flat_map(|zone| zone.items.iter())
            .map(|item| item.id())
            .find(|id| !seen.insert(*id))
    }

    /// Remove every zone whose owner is no longer reachable and return them
    pub fn prune_unreachable(&mut self) -> Vec<(ZoneId, FlatZone)> {
        let reachable = self.reachable_ids();
        let orphaned: Vec<ZoneId> = self
            .zones
            .keys()
            .filter(|zone| !zone.is_root() && !reachable.contains(zone.parent()))
            .cloned()
            .collect();

        orphaned
            .into_iter()
            .filter_map(|zone| self.zones.remove(&zone).map(|flat| (zone, flat)))
            .collect()
    }

    /// Full (non-shallow) node with slot content inlined recursively
    pub fn resolve(&self, node: &ComponentData) -> ComponentData {
        let mut resolved = node.clone();
        self.inline_slots(&mut resolved, &mut HashSet::new());
        resolved
    }

    /// Full content of a zone
    pub fn resolve_zone(&self, zone: &ZoneId) -> Content {
        self.zones
            .get(zone)
            .map(|flat| flat.items.iter().map(|item| self.resolve(item)).collect())
            .unwrap_or_default()
    }

    fn inline_slots(&self, node: &mut ComponentData, visiting: &mut HashSet<String>) {
        if !visiting.insert(node.props.id.clone()) {
            return;
        }

        let slots: Vec<ZoneId> = self
            .zones_of(&node.props.id)
            .filter(|(_, flat)| flat.kind == ZoneType::Slot)
            .map(|(zone, _)| zone.clone())
            .collect();

        for zone in slots {
            let items: Vec<Value> = self.zones[&zone]
                .items
                .iter()
                .map(|item| {
                    let mut child = item.clone();
                    self.inline_slots(&mut child, visiting);
                    child
                })
                .filter_map(|child| serde_json::to_value(child).ok())
                .collect();

            node.props
                .fields
                .insert(zone.name().to_string(), Value::Array(items));
        }

        visiting.remove(&node.props.id);
    }
}

#[derive(Default)]
struct Flattener {
    zones: BTreeMap<ZoneId, FlatZone>,
}

impl Visitor for Flattener {
    fn visit_zone(&mut self, zone: &ZoneId, kind: ZoneType, content: &[ComponentData], config: &Config) {
        self.zones
            .entry(zone.clone())
            .or_insert_with(|| FlatZone::new(kind));
        walk_zone(self, zone, kind, content, config);
    }

    fn visit_component(&mut self, component: &ComponentData, zone: &ZoneId, _index: usize, config: &Config) {
        let mut shallow = component.clone();
        for slot in config.slots(&component.component_type) {
            let slot_zone = ZoneId::compound(component.id(), slot);
            shallow
                .props
                .fields
                .insert(slot.clone(), Value::String(slot_zone.to_string()));
        }

        self.zones
            .entry(zone.clone())
            .or_insert_with(|| FlatZone::new(ZoneType::Dropzone))
            .items
            .push(shallow);

        walk_component(self, component, config);
    }
}

/// Normalize a document into one zone map
pub fn flatten(data: &Data, config: &Config) -> FlatData {
    let mut flattener = Flattener::default();
    flattener.visit_data(data, config);

    FlatData {
        root: data.root.clone(),
        zones: flattener.zones,
    }
}

/// Inverse of `flatten`
pub fn unflatten(flat: &FlatData) -> Data {
    let content = flat.resolve_zone(&ZoneId::root());

    let zones = flat
        .zones
        .iter()
        .filter(|(_, zone)| zone.kind == ZoneType::Dropzone)
        .map(|(id, _)| (id.clone(), flat.resolve_zone(id)))
        .collect();

    Data {
        root: flat.root.clone(),
        content,
        zones,
    }
}

/// Drop dropzones whose owner is not in the document, returning the
/// cleaned document and the zones that were removed
pub fn flush_zones(data: &Data, config: &Config) -> (Data, Vec<(ZoneId, FlatZone)>) {
    let mut flat = flatten(data, config);
    let removed = flat.prune_unreachable();
    (unflatten(&flat), removed)
}

/// Give every node a unique, non-empty id. Nodes with an empty or already
/// seen id get a freshly generated one. Returns the number of ids assigned.
pub fn heal_ids(data: &mut Data, config: &Config, ids: &mut IdGenerator) -> usize {
    struct Healer<'a> {
        ids: &'a mut IdGenerator,
        seen: HashSet<String>,
        healed: usize,
    }

    impl VisitorMut for Healer<'_> {
        fn visit_component_mut(&mut self, component: &mut ComponentData, _zone: &ZoneId, config: &Config) {
            if component.props.id.is_empty()
                || component.props.id == ROOT_ID
                || self.seen.contains(&component.props.id)
            {
                let fresh = self.ids.component_id(&component.component_type);
                tracing::warn!(
                    "Assigning id {} to {} node with missing or duplicate id {:?}",
                    fresh,
                    component.component_type,
                    component.props.id
                );
                component.props.id = fresh;
                self.healed += 1;
            }

            self.seen.insert(component.props.id.clone());
            walk_component_mut(self, component, config);
        }
    }

    let mut healer = Healer {
        ids,
        seen: HashSet::new(),
        healed: 0,
    };
    healer.visit_data_mut(data, config);
    healer.healed
}
