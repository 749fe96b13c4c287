//! Workflow events fired on every state transition

use super::item::WorkflowItemId;
use crate::content::EntityId;
use crate::identity::{ActorId, GroupId};
use std::sync::{Mutex, PoisonError};

/// One transition, for audit and usage tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowEvent {
    pub workflow_item: WorkflowItemId,
    pub item: EntityId,
    pub collection: EntityId,
    pub actor: Option<ActorId>,
    pub old_state: String,
    pub new_state: String,
    /// Owner after the transition; always `None` when entering a pool or ARCHIVE
    pub owner: Option<ActorId>,
    /// Reviewer group offered the task, when a pool was populated
    pub group: Option<GroupId>,
    /// The pool had nobody in it and was passed straight through
    pub skipped: bool,
}

pub trait WorkflowEventListener: Send + Sync {
    fn on_event(&self, event: &WorkflowEvent);
}

/// Listener that keeps every event in memory
#[derive(Debug, Default)]
pub struct WorkflowEventLog {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl WorkflowEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the events recorded so far
    pub fn take_events(&self) -> Vec<WorkflowEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl WorkflowEventListener for WorkflowEventLog {
    fn on_event(&self, event: &WorkflowEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
