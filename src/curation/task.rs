//! Curation tasks and their registry

use super::gate::CurationError;
use crate::content::{ContentStore, EntityId, ObjectType};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Fail,
    Error,
    /// The task does not apply to this object
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    /// Human-readable result, used as the rejection reason
    pub result: String,
}

impl TaskOutcome {
    pub fn new(status: TaskStatus, result: impl Into<String>) -> Self {
        Self {
            status,
            result: result.into(),
        }
    }

    pub fn success(result: impl Into<String>) -> Self {
        Self::new(TaskStatus::Success, result)
    }

    pub fn fail(result: impl Into<String>) -> Self {
        Self::new(TaskStatus::Fail, result)
    }
}

/// A check run against one item
pub trait CurationTask: Send + Sync {
    fn perform(&self, item: &EntityId) -> Result<TaskOutcome, CurationError>;
}

/// Tasks by name, as referenced from task-set configuration
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, Arc<dyn CurationTask>>,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.tasks.iter().map(|t| t.key().clone()).collect();
        names.sort();
        f.debug_struct("TaskRegistry").field("tasks", &names).finish()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, name: impl Into<String>, task: Arc<dyn CurationTask>) -> Self {
        self.register(name, task);
        self
    }

    pub fn register(&self, name: impl Into<String>, task: Arc<dyn CurationTask>) {
        self.tasks.insert(name.into(), task);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CurationTask>> {
        self.tasks.get(name).map(|t| Arc::clone(t.value()))
    }

    pub fn run(&self, name: &str, item: &EntityId) -> Result<TaskOutcome, CurationError> {
        let task = self
            .get(name)
            .ok_or_else(|| CurationError::UnknownTask(name.to_string()))?;
        task.perform(item)
    }
}

/// Fails items missing any of the listed metadata fields
pub struct RequiredMetadataTask {
    content: Arc<dyn ContentStore>,
    fields: Vec<String>,
}

impl RequiredMetadataTask {
    pub fn new(content: Arc<dyn ContentStore>, fields: Vec<String>) -> Self {
        Self { content, fields }
    }
}

impl CurationTask for RequiredMetadataTask {
    fn perform(&self, item: &EntityId) -> Result<TaskOutcome, CurationError> {
        let Some(entity) = self.content.find(ObjectType::Item, item) else {
            return Ok(TaskOutcome::new(TaskStatus::Skip, "item not found"));
        };
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| entity.metadata_values(f).next().is_none())
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(TaskOutcome::success("all required metadata present"))
        } else {
            Ok(TaskOutcome::fail(format!(
                "missing required metadata: {}",
                missing.join(", ")
            )))
        }
    }
}
