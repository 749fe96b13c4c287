//! Persistence seams used by the workflow machine

use super::error::{WorkflowError, WorkflowResult};
use super::item::{Draft, DraftId, TaskListEntry, WorkflowItem, WorkflowItemId};
use crate::content::{Entity, EntityId};
use crate::identity::ActorId;
use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};

/// Storage of workflow items, drafts and task-list entries
pub trait WorkflowStore: Send + Sync {
    fn insert_item(&self, item: &WorkflowItem) -> WorkflowResult<()>;

    fn find_item(&self, id: &WorkflowItemId) -> WorkflowResult<Option<WorkflowItem>>;

    /// Write back a loaded item. Fails with `ConcurrentModification` when the
    /// stored version moved since `item` was read; bumps `item.version` on success.
    fn save_item(&self, item: &mut WorkflowItem) -> WorkflowResult<()>;

    /// Remove an item, with the same version check as `save_item`
    fn delete_item(&self, item: &WorkflowItem) -> WorkflowResult<()>;

    fn items_owned_by(&self, actor: &ActorId) -> WorkflowResult<Vec<WorkflowItem>>;

    fn items_in_collection(&self, collection: &EntityId) -> WorkflowResult<Vec<WorkflowItem>>;

    fn items_submitted_by(&self, actor: &ActorId) -> WorkflowResult<Vec<WorkflowItem>>;

    fn create_task(&self, item: &WorkflowItemId, actor: &ActorId) -> WorkflowResult<()>;

    /// Remove every task-list entry for an item; returns how many went
    fn delete_tasks(&self, item: &WorkflowItemId) -> WorkflowResult<usize>;

    fn tasks_for_item(&self, item: &WorkflowItemId) -> WorkflowResult<Vec<TaskListEntry>>;

    fn tasks_for_actor(&self, actor: &ActorId) -> WorkflowResult<Vec<TaskListEntry>>;

    fn insert_draft(&self, draft: &Draft) -> WorkflowResult<()>;

    fn find_draft(&self, id: &DraftId) -> WorkflowResult<Option<Draft>>;

    fn delete_draft(&self, id: &DraftId) -> WorkflowResult<()>;

    fn drafts_submitted_by(&self, actor: &ActorId) -> WorkflowResult<Vec<Draft>>;
}

/// The content side of a submission: metadata the workflow reads and the
/// install step that makes an item live
pub trait ItemArchive: Send + Sync {
    /// Item title, or collection name
    fn title(&self, id: &EntityId) -> Option<String>;

    fn handle(&self, id: &EntityId) -> Option<String>;

    fn bitstreams(&self, item: &EntityId) -> Vec<Entity>;

    fn add_provenance(&self, item: &EntityId, statement: &str) -> WorkflowResult<()>;

    /// Commit the item into its collection and mark it archived
    fn install(&self, item: &EntityId, collection: &EntityId) -> WorkflowResult<()>;
}

/// DashMap-backed workflow store
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    items: DashMap<WorkflowItemId, WorkflowItem>,
    drafts: DashMap<DraftId, Draft>,
    tasks: Mutex<Vec<TaskListEntry>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<TaskListEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkflowStore for MemoryWorkflowStore {
    fn insert_item(&self, item: &WorkflowItem) -> WorkflowResult<()> {
        self.items.insert(item.id, item.clone());
        Ok(())
    }

    fn find_item(&self, id: &WorkflowItemId) -> WorkflowResult<Option<WorkflowItem>> {
        Ok(self.items.get(id).map(|i| i.value().clone()))
    }

    fn save_item(&self, item: &mut WorkflowItem) -> WorkflowResult<()> {
        let mut stored = self
            .items
            .get_mut(&item.id)
            .ok_or(WorkflowError::ItemNotFound(item.id))?;
        if stored.version != item.version {
            return Err(WorkflowError::ConcurrentModification(item.id));
        }
        item.version += 1;
        *stored = item.clone();
        Ok(())
    }

    fn delete_item(&self, item: &WorkflowItem) -> WorkflowResult<()> {
        let removed = self
            .items
            .remove_if(&item.id, |_, stored| stored.version == item.version);
        match removed {
            Some(_) => Ok(()),
            None if self.items.contains_key(&item.id) => {
                Err(WorkflowError::ConcurrentModification(item.id))
            }
            None => Err(WorkflowError::ItemNotFound(item.id)),
        }
    }

    fn items_owned_by(&self, actor: &ActorId) -> WorkflowResult<Vec<WorkflowItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.owner.as_ref() == Some(actor))
            .map(|i| i.value().clone())
            .collect())
    }

    fn items_in_collection(&self, collection: &EntityId) -> WorkflowResult<Vec<WorkflowItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| &i.collection == collection)
            .map(|i| i.value().clone())
            .collect())
    }

    fn items_submitted_by(&self, actor: &ActorId) -> WorkflowResult<Vec<WorkflowItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.submitter.as_ref() == Some(actor))
            .map(|i| i.value().clone())
            .collect())
    }

    fn create_task(&self, item: &WorkflowItemId, actor: &ActorId) -> WorkflowResult<()> {
        let entry = TaskListEntry {
            workflow_item: *item,
            actor: *actor,
        };
        let mut tasks = self.tasks();
        if !tasks.contains(&entry) {
            tasks.push(entry);
        }
        Ok(())
    }

    fn delete_tasks(&self, item: &WorkflowItemId) -> WorkflowResult<usize> {
        let mut tasks = self.tasks();
        let before = tasks.len();
        tasks.retain(|t| &t.workflow_item != item);
        Ok(before - tasks.len())
    }

    fn tasks_for_item(&self, item: &WorkflowItemId) -> WorkflowResult<Vec<TaskListEntry>> {
        Ok(self
            .tasks()
            .iter()
            .filter(|t| &t.workflow_item == item)
            .copied()
            .collect())
    }

    fn tasks_for_actor(&self, actor: &ActorId) -> WorkflowResult<Vec<TaskListEntry>> {
        Ok(self
            .tasks()
            .iter()
            .filter(|t| &t.actor == actor)
            .copied()
            .collect())
    }

    fn insert_draft(&self, draft: &Draft) -> WorkflowResult<()> {
        self.drafts.insert(draft.id, draft.clone());
        Ok(())
    }

    fn find_draft(&self, id: &DraftId) -> WorkflowResult<Option<Draft>> {
        Ok(self.drafts.get(id).map(|d| d.value().clone()))
    }

    fn delete_draft(&self, id: &DraftId) -> WorkflowResult<()> {
        self.drafts
            .remove(id)
            .map(|_| ())
            .ok_or(WorkflowError::DraftNotFound(*id))
    }

    fn drafts_submitted_by(&self, actor: &ActorId) -> WorkflowResult<Vec<Draft>> {
        Ok(self
            .drafts
            .iter()
            .filter(|d| d.submitter.as_ref() == Some(actor))
            .map(|d| d.value().clone())
            .collect())
    }
}
