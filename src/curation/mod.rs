//! Workflow curation: tasks that vet an item before it may advance

mod curator;
mod gate;
mod queue;
mod task;
mod taskset;

pub use curator::{QueueRun, WorkflowCurator};
pub use gate::{CurationDecision, CurationError, CurationGate, NoCuration};
pub use queue::{CurationQueue, MemoryCurationQueue, QueuedCuration};
pub use task::{CurationTask, RequiredMetadataTask, TaskOutcome, TaskRegistry, TaskStatus};
pub use taskset::{FlowStep, Power, Task, TaskSet, TaskSetRegistry, DEFAULT_MAPPING};
