//! Workflow items, drafts and task-list entries

use super::state::WorkflowState;
use crate::content::EntityId;
use crate::identity::ActorId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowItemId(Uuid);

impl WorkflowItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(Uuid);

impl DraftId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Submission questions answered by the submitter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFlags {
    pub multiple_files: bool,
    pub multiple_titles: bool,
    pub published_before: bool,
}

/// A submission the submitter is still editing (a workspace item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub item: EntityId,
    pub collection: EntityId,
    pub submitter: Option<ActorId>,
    #[serde(default)]
    pub flags: SubmissionFlags,
}

impl Draft {
    pub fn new(item: EntityId, collection: EntityId, submitter: Option<ActorId>) -> Self {
        Self {
            id: DraftId::new(),
            item,
            collection,
            submitter,
            flags: SubmissionFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: SubmissionFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A submission under review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowItem {
    pub id: WorkflowItemId,
    pub item: EntityId,
    pub collection: EntityId,
    pub submitter: Option<ActorId>,
    pub state: WorkflowState,
    /// Reviewer holding the task; set only in claimed states
    pub owner: Option<ActorId>,
    pub flags: SubmissionFlags,
    /// Bumped on every successful save; guards against lost updates
    pub version: u64,
}

impl WorkflowItem {
    /// A fresh workflow item in SUBMIT carrying the draft's data
    pub fn from_draft(draft: &Draft) -> Self {
        Self {
            id: WorkflowItemId::new(),
            item: draft.item,
            collection: draft.collection,
            submitter: draft.submitter,
            state: WorkflowState::Submit,
            owner: None,
            flags: draft.flags,
            version: 0,
        }
    }

    /// The draft this item becomes when it leaves review without archiving
    pub fn to_draft(&self) -> Draft {
        Draft::new(self.item, self.collection, self.submitter).with_flags(self.flags)
    }
}

/// One reviewer's entry in a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskListEntry {
    pub workflow_item: WorkflowItemId,
    pub actor: ActorId,
}
