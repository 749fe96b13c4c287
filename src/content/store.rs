//! Content store: lookup of repository objects, plus an in-memory implementation
//!
//! `MemoryContentStore` records a `ContentEvent` for every mutation made
//! through its public API. Callers drain them with `take_events()` and feed
//! them to whatever consumers are listening.

use super::entity::{Entity, EntityId, ObjectType, PROVENANCE_FIELD};
use super::events::{ContentEvent, EventType, WITHDRAW_DETAIL};
use crate::workflow::{ItemArchive, WorkflowError, WorkflowResult};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Read access to repository objects
pub trait ContentStore: Send + Sync {
    /// Find an object of the given type; `None` if absent or of another type
    fn find(&self, object_type: ObjectType, id: &EntityId) -> Option<Entity>;

    fn find_by_handle(&self, handle: &str) -> Option<Entity>;

    /// The single repository root
    fn site(&self) -> Option<Entity>;

    /// Objects that list `parent` among their owners, in a stable order
    fn list_children(&self, parent: &EntityId) -> Vec<Entity>;

    /// Whether an in-progress submission (draft or workflow item) exists for the item
    fn has_draft_counterpart(&self, item: &EntityId) -> bool;
}

/// Serialized form of a content store, as loaded by the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub entities: Vec<Entity>,
    /// Items that still have an in-progress submission
    #[serde(default)]
    pub in_progress: Vec<EntityId>,
}

/// DashMap-backed content store
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entities: DashMap<EntityId, Entity>,
    handles: DashMap<String, EntityId>,
    in_progress: DashSet<EntityId>,
    events: Mutex<Vec<ContentEvent>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ContentSnapshot) -> Self {
        let store = Self::new();
        for entity in snapshot.entities {
            store.insert(entity);
        }
        for id in snapshot.in_progress {
            store.in_progress.insert(id);
        }
        store
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::from_snapshot(serde_json::from_str(json)?))
    }

    pub fn snapshot(&self) -> ContentSnapshot {
        let mut entities: Vec<Entity> = self.entities.iter().map(|e| e.value().clone()).collect();
        entities.sort_by_key(|e| (e.object_type, e.id));
        ContentSnapshot {
            entities,
            in_progress: self.in_progress.iter().map(|id| *id.key()).collect(),
        }
    }

    /// Load an object without recording events (fixtures, snapshots)
    pub fn insert(&self, entity: Entity) {
        if let Some(handle) = &entity.handle {
            self.handles.insert(handle.clone(), entity.id);
        }
        self.entities.insert(entity.id, entity);
    }

    pub fn get(&self, id: &EntityId) -> Option<Entity> {
        self.entities.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Mark an item as having an in-progress submission
    pub fn begin_submission(&self, item: EntityId) {
        self.in_progress.insert(item);
    }

    /// Drain the events recorded so far
    pub fn take_events(&self) -> Vec<ContentEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, event: ContentEvent) {
        tracing::trace!(%event, "content event");
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Add a new object: CREATE on it, ADD on each owner
    pub fn create(&self, entity: Entity) -> EntityId {
        let id = entity.id;
        let object_type = entity.object_type;
        let parents = entity.parents.clone();
        self.insert(entity);
        self.record(ContentEvent::new(EventType::Create, object_type, id));
        for parent in parents {
            if let Some(owner) = self.get(&parent) {
                self.record(
                    ContentEvent::new(EventType::Add, owner.object_type, owner.id)
                        .with_detail(id.to_string()),
                );
            }
        }
        id
    }

    /// Append a metadata value: MODIFY_METADATA on the object
    pub fn add_metadata(&self, id: &EntityId, field: &str, value: &str) -> bool {
        let object_type = match self.entities.get_mut(id) {
            Some(mut entity) => {
                entity.metadata.push(super::entity::MetadataValue {
                    field: field.to_string(),
                    value: value.to_string(),
                });
                entity.object_type
            }
            None => return false,
        };
        self.record(ContentEvent::new(EventType::ModifyMetadata, object_type, *id));
        true
    }

    /// Touch an object without changing metadata: MODIFY
    pub fn touch(&self, id: &EntityId) -> bool {
        match self.get(id) {
            Some(entity) => {
                self.record(ContentEvent::new(EventType::Modify, entity.object_type, *id));
                true
            }
            None => false,
        }
    }

    /// Withdraw an archived item: MODIFY with the withdraw marker
    pub fn withdraw(&self, item: &EntityId) -> bool {
        match self.entities.get_mut(item) {
            Some(mut entity) if entity.is_item() => {
                entity.status.withdrawn = true;
                entity.status.archived = false;
            }
            _ => return false,
        }
        self.record(
            ContentEvent::new(EventType::Modify, ObjectType::Item, *item).with_detail(WITHDRAW_DETAIL),
        );
        true
    }

    /// Reinstate a withdrawn item: plain MODIFY
    pub fn reinstate(&self, item: &EntityId) -> bool {
        match self.entities.get_mut(item) {
            Some(mut entity) if entity.is_item() => {
                entity.status.withdrawn = false;
                entity.status.archived = true;
            }
            _ => return false,
        }
        self.record(ContentEvent::new(EventType::Modify, ObjectType::Item, *item));
        true
    }

    /// Hard-delete an object: REMOVE on each owner, then DELETE carrying
    /// the handle and external identifiers it had
    pub fn remove(&self, id: &EntityId) -> Option<Entity> {
        let (_, entity) = self.entities.remove(id)?;
        if let Some(handle) = &entity.handle {
            self.handles.remove(handle);
        }
        self.in_progress.remove(id);
        for parent in &entity.parents {
            if let Some(owner) = self.get(parent) {
                self.record(
                    ContentEvent::new(EventType::Remove, owner.object_type, owner.id)
                        .with_detail(id.to_string()),
                );
            }
        }
        let mut event = ContentEvent::new(EventType::Delete, entity.object_type, entity.id)
            .with_identifiers(entity.external_identifiers.clone());
        if let Some(handle) = &entity.handle {
            event = event.with_detail(handle.clone());
        }
        self.record(event);
        Some(entity)
    }

    /// Bitstreams of an item, reached through its bundles
    pub fn item_bitstreams(&self, item: &EntityId) -> Vec<Entity> {
        self.list_children(item)
            .into_iter()
            .filter(|c| c.object_type == ObjectType::Bundle)
            .flat_map(|bundle| self.list_children(&bundle.id))
            .filter(|c| c.object_type == ObjectType::Bitstream)
            .collect()
    }
}

impl ContentStore for MemoryContentStore {
    fn find(&self, object_type: ObjectType, id: &EntityId) -> Option<Entity> {
        self.entities
            .get(id)
            .filter(|e| e.object_type == object_type)
            .map(|e| e.value().clone())
    }

    fn find_by_handle(&self, handle: &str) -> Option<Entity> {
        let id = *self.handles.get(handle)?;
        self.get(&id)
    }

    fn site(&self) -> Option<Entity> {
        self.entities
            .iter()
            .find(|e| e.object_type == ObjectType::Site)
            .map(|e| e.value().clone())
    }

    fn list_children(&self, parent: &EntityId) -> Vec<Entity> {
        let mut children: Vec<Entity> = self
            .entities
            .iter()
            .filter(|e| e.parents.contains(parent))
            .map(|e| e.value().clone())
            .collect();
        children.sort_by(|a, b| {
            (a.object_type, &a.handle, a.id).cmp(&(b.object_type, &b.handle, b.id))
        });
        children
    }

    fn has_draft_counterpart(&self, item: &EntityId) -> bool {
        self.in_progress.contains(item)
    }
}

impl ItemArchive for MemoryContentStore {
    fn title(&self, id: &EntityId) -> Option<String> {
        self.get(id).and_then(|e| e.title().map(str::to_string))
    }

    fn handle(&self, id: &EntityId) -> Option<String> {
        self.get(id).and_then(|e| e.handle)
    }

    fn bitstreams(&self, item: &EntityId) -> Vec<Entity> {
        self.item_bitstreams(item)
    }

    fn add_provenance(&self, item: &EntityId, statement: &str) -> WorkflowResult<()> {
        if self.add_metadata(item, PROVENANCE_FIELD, statement) {
            Ok(())
        } else {
            Err(WorkflowError::ContentNotFound(*item))
        }
    }

    fn install(&self, item: &EntityId, collection: &EntityId) -> WorkflowResult<()> {
        {
            let mut entity = self
                .entities
                .get_mut(item)
                .ok_or(WorkflowError::ContentNotFound(*item))?;
            entity.status.archived = true;
            entity.status.withdrawn = false;
            if !entity.parents.contains(collection) {
                entity.parents.push(*collection);
            }
        }
        self.in_progress.remove(item);

        self.record(ContentEvent::new(EventType::Install, ObjectType::Item, *item));
        self.record(ContentEvent::new(EventType::Modify, ObjectType::Item, *item));
        self.record(
            ContentEvent::new(EventType::Add, ObjectType::Collection, *collection)
                .with_detail(item.to_string()),
        );
        Ok(())
    }
}
