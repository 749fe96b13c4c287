//! Task sets: which curation tasks run at which workflow step

use super::task::TaskStatus;
use crate::config::CurationSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the mapping used for collections without their own
pub const DEFAULT_MAPPING: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    /// A failing result sends the item back to its submitter
    Reject,
    /// A passing result lets the item advance without further tasks
    Approve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub powers: Vec<Power>,
    /// Who hears about each outcome: `$flowgroup`, `$colladmin`,
    /// `$siteadmin` or a literal address
    #[serde(default)]
    pub contacts: BTreeMap<TaskStatus, Vec<String>>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            powers: Vec::new(),
            contacts: BTreeMap::new(),
        }
    }

    pub fn with_power(mut self, power: Power) -> Self {
        if !self.powers.contains(&power) {
            self.powers.push(power);
        }
        self
    }

    pub fn with_contact(mut self, status: TaskStatus, contact: impl Into<String>) -> Self {
        self.contacts.entry(status).or_default().push(contact.into());
        self
    }

    pub fn has_power(&self, power: Power) -> bool {
        self.powers.contains(&power)
    }

    pub fn contacts_for(&self, status: TaskStatus) -> &[String] {
        self.contacts.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Tasks attached to one workflow state, matched by state name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub name: String,
    /// Run asynchronously on this queue instead of inline
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl FlowStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: None,
            tasks: Vec::new(),
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSet {
    pub name: String,
    pub steps: Vec<FlowStep>,
}

impl TaskSet {
    pub fn new(name: impl Into<String>, steps: Vec<FlowStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Flow step for a state name such as `STEP1` or `submit`, case-insensitive
    pub fn step(&self, state_name: &str) -> Option<&FlowStep> {
        self.steps
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(state_name))
    }
}

/// Resolves a collection's task set
#[derive(Debug, Clone, Default)]
pub struct TaskSetRegistry {
    sets: BTreeMap<String, Arc<TaskSet>>,
    mappings: BTreeMap<String, String>,
    empty: Arc<TaskSet>,
}

impl TaskSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &CurationSettings) -> Self {
        let mut registry = Self::new();
        for (name, steps) in &settings.task_sets {
            registry = registry.with_task_set(TaskSet::new(name.clone(), steps.clone()));
        }
        for (collection, set) in &settings.mappings {
            registry = registry.with_mapping(collection.clone(), set.clone());
        }
        registry
    }

    pub fn with_task_set(mut self, set: TaskSet) -> Self {
        self.sets.insert(set.name.clone(), Arc::new(set));
        self
    }

    /// Map a collection handle (or `default`) to a task set name
    pub fn with_mapping(mut self, collection: impl Into<String>, set: impl Into<String>) -> Self {
        self.mappings.insert(collection.into(), set.into());
        self
    }

    /// The collection's own mapping, else the default mapping, else an
    /// empty task set
    pub fn for_collection(&self, handle: Option<&str>) -> Arc<TaskSet> {
        handle
            .and_then(|h| self.mappings.get(h))
            .or_else(|| self.mappings.get(DEFAULT_MAPPING))
            .and_then(|name| self.sets.get(name))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TaskSetRegistry {
        TaskSetRegistry::new()
            .with_task_set(TaskSet::new(
                "strict",
                vec![FlowStep::new("step1").with_task(Task::new("vscan").with_power(Power::Reject))],
            ))
            .with_task_set(TaskSet::new(
                "light",
                vec![FlowStep::new("step2").with_task(Task::new("profile"))],
            ))
            .with_mapping("123456789/7", "light")
            .with_mapping(DEFAULT_MAPPING, "strict")
    }

    #[test]
    fn collection_mapping_wins_over_default() {
        let registry = registry();
        assert_eq!(registry.for_collection(Some("123456789/7")).name, "light");
        assert_eq!(registry.for_collection(Some("123456789/8")).name, "strict");
        assert_eq!(registry.for_collection(None).name, "strict");
    }

    #[test]
    fn no_default_mapping_gives_empty_set() {
        let registry = TaskSetRegistry::new();
        let set = registry.for_collection(Some("123456789/7"));
        assert!(set.steps.is_empty());
        assert!(set.step("STEP1").is_none());
    }

    #[test]
    fn step_lookup_ignores_case() {
        let set = registry().for_collection(None);
        let step = set.step("STEP1").unwrap();
        assert!(step.tasks[0].has_power(Power::Reject));
        assert!(!step.tasks[0].has_power(Power::Approve));
    }

    #[test]
    fn contacts_are_grouped_by_status() {
        let task = Task::new("vscan")
            .with_contact(TaskStatus::Fail, "$flowgroup")
            .with_contact(TaskStatus::Fail, "ops@example.org");
        assert_eq!(task.contacts_for(TaskStatus::Fail).len(), 2);
        assert!(task.contacts_for(TaskStatus::Error).is_empty());
    }
}
