//! Submission review workflow
//!
//! A draft enters review in SUBMIT, passes through M pool/claimed step pairs
//! and ends in ARCHIVE, or goes back to its submitter as a draft.

mod error;
mod events;
mod item;
mod machine;
pub mod provenance;
mod services;
mod state;

pub use error::{WorkflowError, WorkflowResult};
pub use events::{WorkflowEvent, WorkflowEventListener, WorkflowEventLog};
pub use item::{Draft, DraftId, SubmissionFlags, TaskListEntry, WorkflowItem, WorkflowItemId};
pub use machine::{AdvanceOptions, WorkflowStateMachine};
pub use services::{ItemArchive, MemoryWorkflowStore, WorkflowStore};
pub use state::{WorkflowState, WorkflowStates, DEFAULT_STEPS, UNKNOWN_STATE};
