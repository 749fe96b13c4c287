//! Repository objects referenced by content events

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a repository object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new random EntityId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an EntityId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of repository object.
///
/// Only Site, Community, Collection and Item are independent subjects;
/// the others show up in events and are folded into their owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Site,
    Community,
    Collection,
    Item,
    Bundle,
    Bitstream,
    EPerson,
    Group,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Community => "community",
            Self::Collection => "collection",
            Self::Item => "item",
            Self::Bundle => "bundle",
            Self::Bitstream => "bitstream",
            Self::EPerson => "eperson",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single qualified metadata value, e.g. `dc.title = "On Rust"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub field: String,
    pub value: String,
}

/// Metadata field that carries provenance statements
pub const PROVENANCE_FIELD: &str = "dc.description.provenance";

/// Publication flags; only meaningful on items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStatus {
    pub archived: bool,
    pub withdrawn: bool,
    pub discoverable: bool,
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self {
            archived: false,
            withdrawn: false,
            discoverable: true,
        }
    }
}

/// Stored file details for a bitstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub size_bytes: u64,
    pub checksum: String,
    pub checksum_algorithm: String,
}

/// A repository object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning objects: bitstream -> bundles, bundle -> items, item -> collections,
    /// collection -> communities, community -> parent community or site
    #[serde(default)]
    pub parents: Vec<EntityId>,
    #[serde(default)]
    pub metadata: Vec<MetadataValue>,
    #[serde(default)]
    pub external_identifiers: Vec<String>,
    /// Hidden from anonymous readers
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
}

impl Entity {
    pub fn new(object_type: ObjectType, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            object_type,
            handle: None,
            name: Some(name.into()),
            parents: Vec::new(),
            metadata: Vec::new(),
            external_identifiers: Vec::new(),
            restricted: false,
            status: ItemStatus::default(),
            file: None,
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
        self
    }

    pub fn with_metadata(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(MetadataValue {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_external_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.external_identifiers.push(identifier.into());
        self
    }

    pub fn with_file(
        mut self,
        size_bytes: u64,
        checksum: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        self.file = Some(FileInfo {
            size_bytes,
            checksum: checksum.into(),
            checksum_algorithm: algorithm.into(),
        });
        self
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn archived(mut self) -> Self {
        self.status.archived = true;
        self
    }

    pub fn withdrawn(mut self) -> Self {
        self.status.archived = false;
        self.status.withdrawn = true;
        self
    }

    pub fn undiscoverable(mut self) -> Self {
        self.status.discoverable = false;
        self
    }

    /// All values recorded for a metadata field, in insertion order
    pub fn metadata_values<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.metadata
            .iter()
            .filter(move |m| m.field == field)
            .map(|m| m.value.as_str())
    }

    /// First `dc.title`, falling back to the object's name
    pub fn title(&self) -> Option<&str> {
        self.metadata_values("dc.title")
            .next()
            .or(self.name.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn is_item(&self) -> bool {
        self.object_type == ObjectType::Item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_dc_title_over_name() {
        let item = Entity::new(ObjectType::Item, "file-name").with_metadata("dc.title", "On Rust");
        assert_eq!(item.title(), Some("On Rust"));
    }

    #[test]
    fn blank_title_is_none() {
        let item = Entity::new(ObjectType::Item, "  ");
        assert_eq!(item.title(), None);
    }

    #[test]
    fn items_are_discoverable_by_default() {
        let item = Entity::new(ObjectType::Item, "x");
        assert!(item.status.discoverable);
        assert!(!item.status.archived);
    }

    #[test]
    fn withdrawing_clears_archived_flag() {
        let item = Entity::new(ObjectType::Item, "x").archived().withdrawn();
        assert!(item.status.withdrawn);
        assert!(!item.status.archived);
    }

    #[test]
    fn parents_are_not_duplicated() {
        let parent = EntityId::new();
        let item = Entity::new(ObjectType::Item, "x")
            .with_parent(parent)
            .with_parent(parent);
        assert_eq!(item.parents, vec![parent]);
    }

    #[test]
    fn snapshot_defaults_apply_when_fields_missing() {
        let json = r#"{"id":"6f1c1f8e-8e0a-4a55-9b52-7dbb5e3bd8a4","object_type":"item"}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert!(entity.parents.is_empty());
        assert!(entity.status.discoverable);
        assert!(!entity.restricted);
    }
}
