//! # Tree Indexes
//!
//! Flat lookups derived from the document on every data transition.
//!
//! - `nodes`: node id → where the node sits (zone, parent, ancestor path)
//! - `zones`: compound zone id → ordered child ids and zone kind
//!
//! The root node `"root"` is indexed like any other node with no parent,
//! no zone and an empty path. Indexes are never edited by hand.

use crate::flatten::{flatten, FlatData};
use pagecraft_common::{ComponentData, Config, Data, Props, ZoneId, ZoneType, ROOT_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Node as stored; slot props hold their zone id
    pub data: ComponentData,

    /// Node with slot content inlined
    pub flat_data: ComponentData,

    pub parent_id: Option<String>,

    /// Zone the node sits in (`None` for the root node)
    pub zone: Option<ZoneId>,

    /// Ancestor ids, starting at the root
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub content_ids: Vec<String>,

    #[serde(rename = "type")]
    pub kind: ZoneType,
}

pub type NodeIndex = BTreeMap<String, NodeRecord>;
pub type ZoneIndex = BTreeMap<ZoneId, ZoneRecord>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indexes {
    pub nodes: NodeIndex,
    pub zones: ZoneIndex,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Node {0} is not indexed")]
    MissingNode(String),

    #[error("Node {0} is indexed but not placed in any zone")]
    UnplacedNode(String),

    #[error("Node {0} appears in more than one zone")]
    DuplicatePlacement(String),

    #[error("Node {id} records zone {recorded:?} but sits in {actual}")]
    WrongZone {
        id: String,
        recorded: Option<ZoneId>,
        actual: ZoneId,
    },

    #[error("Node {0} has an inconsistent ancestor path")]
    InconsistentPath(String),
}

/// Build node and zone indexes for a document
pub fn build_indexes(data: &Data, config: &Config) -> Indexes {
    Indexes::from_flat(&flatten(data, config))
}

impl Indexes {
    pub fn from_flat(flat: &FlatData) -> Self {
        let mut zones = ZoneIndex::new();
        let mut placements: Vec<(&ComponentData, &ZoneId)> = Vec::new();

        for (zone_id, zone) in &flat.zones {
            zones.insert(
                zone_id.clone(),
                ZoneRecord {
                    content_ids: zone.items.iter().map(|item| item.props.id.clone()).collect(),
                    kind: zone.kind,
                },
            );

            for item in &zone.items {
                placements.push((item, zone_id));
            }
        }

        let known: HashSet<&str> = placements
            .iter()
            .map(|(item, _)| item.props.id.as_str())
            .chain(std::iter::once(ROOT_ID))
            .collect();

        // Zones whose owner is gone hang off the root
        let parents: HashMap<&str, &str> = placements
            .iter()
            .map(|(item, zone)| {
                let parent = if known.contains(zone.parent()) {
                    zone.parent()
                } else {
                    ROOT_ID
                };
                (item.props.id.as_str(), parent)
            })
            .collect();

        let mut nodes = NodeIndex::new();
        nodes.insert(ROOT_ID.to_string(), root_record(flat));

        for (item, zone) in placements {
            let id = item.props.id.as_str();
            let parent = parents.get(id).copied().unwrap_or(ROOT_ID);

            nodes.insert(
                id.to_string(),
                NodeRecord {
                    data: item.clone(),
                    flat_data: flat.resolve(item),
                    parent_id: Some(parent.to_string()),
                    zone: Some(zone.clone()),
                    path: ancestor_path(id, &parents),
                },
            );
        }

        Self { nodes, zones }
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn zone(&self, zone: &ZoneId) -> Option<&ZoneRecord> {
        self.zones.get(zone)
    }

    /// Position of a node within its zone
    pub fn locate(&self, id: &str) -> Option<(ZoneId, usize)> {
        let zone = self.nodes.get(id)?.zone.clone()?;
        let index = self.zones.get(&zone)?.content_ids.iter().position(|c| c == id)?;
        Some((zone, index))
    }

    /// Verify the node/zone invariants
    pub fn check(&self) -> Result<(), IndexError> {
        let mut placed: HashMap<&str, &ZoneId> = HashMap::new();

        for (zone_id, zone) in &self.zones {
            for id in &zone.content_ids {
                if placed.insert(id.as_str(), zone_id).is_some() {
                    return Err(IndexError::DuplicatePlacement(id.clone()));
                }

                let node = self
                    .nodes
                    .get(id)
                    .ok_or_else(|| IndexError::MissingNode(id.clone()))?;

                if node.zone.as_ref() != Some(zone_id) {
                    return Err(IndexError::WrongZone {
                        id: id.clone(),
                        recorded: node.zone.clone(),
                        actual: zone_id.clone(),
                    });
                }
            }
        }

        for (id, node) in &self.nodes {
            if id == ROOT_ID {
                continue;
            }

            if !placed.contains_key(id.as_str()) {
                return Err(IndexError::UnplacedNode(id.clone()));
            }

            let parent_id = node
                .parent_id
                .as_deref()
                .ok_or_else(|| IndexError::InconsistentPath(id.clone()))?;
            let parent = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| IndexError::InconsistentPath(id.clone()))?;

            let mut expected = parent.path.clone();
            expected.push(parent_id.to_string());
            if expected != node.path {
                return Err(IndexError::InconsistentPath(id.clone()));
            }
        }

        Ok(())
    }
}

fn root_record(flat: &FlatData) -> NodeRecord {
    let root = ComponentData {
        component_type: ROOT_ID.to_string(),
        props: Props {
            id: ROOT_ID.to_string(),
            placeholder: false,
            fields: flat.root.props.clone(),
        },
    };

    NodeRecord {
        data: root.clone(),
        flat_data: root,
        parent_id: None,
        zone: None,
        path: Vec::new(),
    }
}

/// Walk parent links up to the root. A cycle (only possible in malformed
/// zone data) is cut off at the root.
fn ancestor_path(id: &str, parents: &HashMap<&str, &str>) -> Vec<String> {
    let mut path = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(id);

    let mut current = parents.get(id).copied();
    while let Some(parent) = current {
        if parent == ROOT_ID || !seen.insert(parent) {
            break;
        }
        path.push(parent.to_string());
        current = parents.get(parent).copied();
    }

    path.push(ROOT_ID.to_string());
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_common::ComponentConfig;
    use serde_json::json;

    fn config() -> Config {
        Config::default()
            .with_component("Heading", ComponentConfig::default())
            .with_component("Card", ComponentConfig::default().with_slot("items"))
            .with_component("Columns", ComponentConfig::default())
    }

    fn document() -> Data {
        serde_json::from_value(json!({
            "content": [
                { "type": "Columns", "props": { "id": "cols" } },
                { "type": "Heading", "props": { "id": "top" } }
            ],
            "zones": {
                "cols:left": [
                    { "type": "Card", "props": { "id": "card", "items": [
                        { "type": "Heading", "props": { "id": "deep" } }
                    ] } }
                ],
                "cols:right": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_document_indexes_root() {
        let indexes = build_indexes(&Data::default(), &config());

        assert_eq!(indexes.nodes.len(), 1);
        let root = indexes.node(ROOT_ID).unwrap();
        assert_eq!(root.parent_id, None);
        assert!(root.path.is_empty());

        assert_eq!(indexes.zones.len(), 1);
        assert_eq!(indexes.zone(&ZoneId::root()).unwrap().kind, ZoneType::Root);
        assert!(indexes.check().is_ok());
    }

    #[test]
    fn test_paths_follow_nesting() {
        let indexes = build_indexes(&document(), &config());

        assert_eq!(indexes.node("top").unwrap().path, vec!["root"]);
        assert_eq!(indexes.node("card").unwrap().path, vec!["root", "cols"]);
        assert_eq!(indexes.node("card").unwrap().parent_id.as_deref(), Some("cols"));

        let deep = indexes.node("deep").unwrap();
        assert_eq!(deep.path, vec!["root", "cols", "card"]);
        assert_eq!(deep.zone, Some(ZoneId::new("card:items")));

        assert!(indexes.check().is_ok());
    }

    #[test]
    fn test_zone_records() {
        let indexes = build_indexes(&document(), &config());

        assert_eq!(
            indexes.zone(&ZoneId::root()).unwrap().content_ids,
            vec!["cols", "top"]
        );
        assert_eq!(
            indexes.zone(&ZoneId::new("cols:left")).unwrap().kind,
            ZoneType::Dropzone
        );
        assert_eq!(
            indexes.zone(&ZoneId::new("card:items")).unwrap().kind,
            ZoneType::Slot
        );
        // Registered zone with no nodes is present and empty
        assert!(indexes
            .zone(&ZoneId::new("cols:right"))
            .unwrap()
            .content_ids
            .is_empty());
    }

    #[test]
    fn test_data_and_flat_data() {
        let indexes = build_indexes(&document(), &config());
        let card = indexes.node("card").unwrap();

        assert_eq!(card.data.props.fields["items"], json!("card:items"));
        assert_eq!(card.flat_data.props.fields["items"][0]["props"]["id"], json!("deep"));
    }

    #[test]
    fn test_orphan_zone_falls_back_to_root() {
        let mut data = document();
        data.zones.insert(
            ZoneId::new("ghost:main"),
            vec![ComponentData::new("Heading", "stray")],
        );

        let indexes = build_indexes(&data, &config());
        let stray = indexes.node("stray").unwrap();
        assert_eq!(stray.parent_id.as_deref(), Some(ROOT_ID));
        assert_eq!(stray.path, vec!["root"]);
        assert!(indexes.check().is_ok());
    }

    #[test]
    fn test_locate() {
        let indexes = build_indexes(&document(), &config());
        assert_eq!(indexes.locate("top"), Some((ZoneId::root(), 1)));
        assert_eq!(indexes.locate("missing"), None);
    }

    #[test]
    fn test_check_detects_tampering() {
        let mut indexes = build_indexes(&document(), &config());
        indexes.nodes.get_mut("deep").unwrap().path = vec!["root".to_string()];
        assert_eq!(
            indexes.check(),
            Err(IndexError::InconsistentPath("deep".to_string()))
        );
    }
}
