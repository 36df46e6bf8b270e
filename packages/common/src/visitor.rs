use crate::config::Config;
use crate::data::*;
use crate::zone::{ZoneId, ZoneType};
use serde_json::Value;

/// Visitor pattern for traversing a document immutably
///
/// The walk visits the root content, every dropzone in `data.zones`, and
/// the inline content of every slot declared in the config registry.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_data(&mut self, data: &Data, config: &Config) {
        walk_data(self, data, config);
    }

    fn visit_root(&mut self, _root: &RootData) {
        // Leaf node, no children to walk
    }

    fn visit_zone(&mut self, zone: &ZoneId, kind: ZoneType, content: &[ComponentData], config: &Config) {
        walk_zone(self, zone, kind, content, config);
    }

    fn visit_component(
        &mut self,
        component: &ComponentData,
        zone: &ZoneId,
        index: usize,
        config: &Config,
    ) {
        let _ = (zone, index);
        walk_component(self, component, config);
    }
}

pub fn walk_data<V: Visitor>(visitor: &mut V, data: &Data, config: &Config) {
    visitor.visit_root(&data.root);
    visitor.visit_zone(&ZoneId::root(), ZoneType::Root, &data.content, config);

    for (zone, content) in &data.zones {
        visitor.visit_zone(zone, ZoneType::Dropzone, content, config);
    }
}

pub fn walk_zone<V: Visitor>(
    visitor: &mut V,
    zone: &ZoneId,
    _kind: ZoneType,
    content: &[ComponentData],
    config: &Config,
) {
    for (index, component) in content.iter().enumerate() {
        visitor.visit_component(component, zone, index, config);
    }
}

pub fn walk_component<V: Visitor>(visitor: &mut V, component: &ComponentData, config: &Config) {
    for slot in config.slots(&component.component_type) {
        let zone = ZoneId::compound(component.id(), slot);
        let content = slot_content(component, slot);
        visitor.visit_zone(&zone, ZoneType::Slot, &content, config);
    }
}

/// Decode the inline content of a slot prop. Missing or malformed entries
/// are skipped.
pub fn slot_content(component: &ComponentData, slot: &str) -> Content {
    match component.props.fields.get(slot) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Mutable visitor pattern for transforming a document
///
/// Similar to Visitor, but provides mutable access to nodes. Slot content
/// is decoded, visited and written back into the owning prop.
pub trait VisitorMut: Sized {
    fn visit_data_mut(&mut self, data: &mut Data, config: &Config) {
        walk_data_mut(self, data, config);
    }

    fn visit_zone_mut(&mut self, zone: &ZoneId, content: &mut Content, config: &Config) {
        walk_zone_mut(self, zone, content, config);
    }

    fn visit_component_mut(&mut self, component: &mut ComponentData, zone: &ZoneId, config: &Config) {
        let _ = zone;
        walk_component_mut(self, component, config);
    }
}

pub fn walk_data_mut<V: VisitorMut>(visitor: &mut V, data: &mut Data, config: &Config) {
    visitor.visit_zone_mut(&ZoneId::root(), &mut data.content, config);

    for (zone, content) in data.zones.iter_mut() {
        visitor.visit_zone_mut(zone, content, config);
    }
}

pub fn walk_zone_mut<V: VisitorMut>(
    visitor: &mut V,
    zone: &ZoneId,
    content: &mut Content,
    config: &Config,
) {
    for component in content.iter_mut() {
        visitor.visit_component_mut(component, zone, config);
    }
}

pub fn walk_component_mut<V: VisitorMut>(visitor: &mut V, component: &mut ComponentData, config: &Config) {
    for slot in config.slots(&component.component_type).to_vec() {
        if !matches!(component.props.fields.get(&slot), Some(Value::Array(_))) {
            continue;
        }

        let mut content = slot_content(component, &slot);
        let zone = ZoneId::compound(component.id(), &slot);
        visitor.visit_zone_mut(&zone, &mut content, config);

        if let Ok(value) = serde_json::to_value(&content) {
            component.props.fields.insert(slot, value);
        }
    }
}
