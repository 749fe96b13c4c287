//! Accession: submission review and change propagation for a digital repository
//!
//! Two subsystems share one content model:
//!
//! - **Workflow**: a submitted draft moves through configurable review steps
//!   (pool, then claimed) until it is archived or returned to its submitter.
//! - **Propagation**: content change events are folded into per-subject
//!   convert/delete work and replayed against an external graph store at the
//!   end of each batch.
//!
//! # Example
//!
//! ```
//! use accession::{WorkflowState, WorkflowStates};
//!
//! let states = WorkflowStates::new(3);
//! assert_eq!(states.id_of("step2pool"), 3);
//! assert_eq!(states.parse("ARCHIVE"), Some(WorkflowState::Archive));
//! ```

pub mod config;
pub mod content;
pub mod curation;
pub mod identity;
pub mod notify;
pub mod propagation;
pub mod storage;
pub mod workflow;

pub use config::{ConfigError, Settings};
pub use content::{
    ContentEvent, ContentStore, Entity, EntityId, EventType, MemoryContentStore, ObjectType,
    SubjectIdentifier, SubjectKind,
};
pub use curation::{CurationDecision, CurationGate, NoCuration, WorkflowCurator};
pub use identity::{Actor, ActorId, AuthorizationOracle, MemoryDirectory, ReviewerDirectory};
pub use notify::{LogNotifier, Notifier, Template};
pub use propagation::{
    ChangePropagationConsumer, Converter, Deduplicator, DrainReport, PropagationError,
    Rebuilder, Transaction,
};
pub use storage::{
    GraphStore, MemoryGraphStore, NamedGraph, OpenStore, SqliteStore, StorageError, StorageResult,
};
pub use workflow::{
    AdvanceOptions, Draft, WorkflowError, WorkflowEvent, WorkflowItem, WorkflowResult,
    WorkflowState, WorkflowStateMachine, WorkflowStates,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
