//! Compound zone identifiers.
//!
//! A zone is addressed by `parentNodeId:zoneName`. The root content list is
//! the distinguished zone `"root"`, owned by the root node `"root"`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the always-present root node
pub const ROOT_ID: &str = "root";

/// Id of the root node's content zone
pub const ROOT_ZONE: &str = "root";

/// Older documents and drop targets address the root content this way
pub const LEGACY_ROOT_ZONE: &str = "root:default-zone";

/// Prefix carried by drop targets that are zone containers, not siblings
pub const ZONE_TARGET_PREFIX: &str = "zone:";

/// Kind of drop area a zone represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Root,
    Dropzone,
    Slot,
}

/// Compound zone id (`parent:name`, or `root`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ZoneId(String);

impl ZoneId {
    /// Create a zone id, normalizing the legacy root alias
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id == LEGACY_ROOT_ZONE {
            Self(ROOT_ZONE.to_string())
        } else {
            Self(id)
        }
    }

    pub fn root() -> Self {
        Self(ROOT_ZONE.to_string())
    }

    /// Build `parent:name`
    pub fn compound(parent: &str, name: &str) -> Self {
        Self::new(format!("{}:{}", parent, name))
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ZONE
    }

    /// Owning node id. The root zone is owned by the root node.
    pub fn parent(&self) -> &str {
        match self.0.split_once(':') {
            Some((parent, _)) => parent,
            None => ROOT_ID,
        }
    }

    /// Zone name within its parent
    pub fn name(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a drop target id such as `zone:Card-1:items`
    pub fn from_target(target_id: &str) -> Option<Self> {
        target_id.strip_prefix(ZONE_TARGET_PREFIX).map(ZoneId::new)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        ZoneId::new(s)
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        ZoneId::new(s)
    }
}

impl From<ZoneId> for String {
    fn from(zone: ZoneId) -> Self {
        zone.0
    }
}

impl AsRef<str> for ZoneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
