//! Workflow error types

use super::item::{DraftId, WorkflowItemId};
use crate::content::EntityId;
use crate::curation::CurationError;
use crate::identity::AccessDenied;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow item not found: {0}")]
    ItemNotFound(WorkflowItemId),

    #[error("draft not found: {0}")]
    DraftNotFound(DraftId),

    #[error("content object not found: {0}")]
    ContentNotFound(EntityId),

    #[error("cannot {operation} from state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("{0} requires an acting reviewer")]
    ActorRequired(&'static str),

    #[error(transparent)]
    NotAuthorized(#[from] AccessDenied),

    #[error("workflow item {0} was modified concurrently")]
    ConcurrentModification(WorkflowItemId),

    /// Backend failure reported by a store or archive implementation
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("curation failed: {0}")]
    Curation(#[from] CurationError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
