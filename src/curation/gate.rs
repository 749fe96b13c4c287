//! The seam the workflow machine consults before every advance

use crate::workflow::WorkflowItem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurationError {
    #[error("no curation task registered as '{0}'")]
    UnknownTask(String),

    #[error("curation task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("curation queue error: {0}")]
    Queue(String),
}

/// What the gate wants the caller's advance to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurationDecision {
    /// Carry on with the transition now
    Proceed,
    /// Tasks were queued; a worker re-invokes advance when they finish
    Deferred,
    /// A task with reject power failed; the item goes back to its submitter
    Rejected { reason: String },
}

pub trait CurationGate: Send + Sync {
    fn needs_curation(&self, item: &WorkflowItem) -> bool;

    fn run_curation(&self, item: &WorkflowItem) -> Result<CurationDecision, CurationError>;
}

/// Gate for repositories without workflow curation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCuration;

impl CurationGate for NoCuration {
    fn needs_curation(&self, _item: &WorkflowItem) -> bool {
        false
    }

    fn run_curation(&self, _item: &WorkflowItem) -> Result<CurationDecision, CurationError> {
        Ok(CurationDecision::Proceed)
    }
}
