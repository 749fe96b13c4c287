//! Task-set driven curation gate
//!
//! A flow step whose name matches the item's current state means the item
//! needs curation. Steps with a queue are deferred to a worker that calls
//! [`WorkflowCurator::process_queue`]; the rest run inline, in order.

use super::gate::{CurationDecision, CurationError, CurationGate};
use super::queue::{CurationQueue, QueuedCuration};
use super::task::{TaskOutcome, TaskRegistry, TaskStatus};
use super::taskset::{FlowStep, Power, Task, TaskSetRegistry};
use crate::identity::ReviewerDirectory;
use crate::notify::{Notifier, Template};
use crate::workflow::{
    AdvanceOptions, ItemArchive, WorkflowItem, WorkflowItemId, WorkflowResult, WorkflowStateMachine,
    WorkflowStates,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one pass over a curation queue
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueRun {
    pub processed: usize,
    /// Items whose curation failed and went back on the queue
    pub requeued: Vec<WorkflowItemId>,
}

const FLOW_GROUP: &str = "$flowgroup";
const COLLECTION_ADMIN: &str = "$colladmin";
const SITE_ADMIN: &str = "$siteadmin";

pub struct WorkflowCurator {
    states: WorkflowStates,
    task_sets: Arc<TaskSetRegistry>,
    tasks: Arc<TaskRegistry>,
    queue: Arc<dyn CurationQueue>,
    archive: Arc<dyn ItemArchive>,
    directory: Arc<dyn ReviewerDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowCurator {
    pub fn new(
        states: WorkflowStates,
        task_sets: Arc<TaskSetRegistry>,
        tasks: Arc<TaskRegistry>,
        queue: Arc<dyn CurationQueue>,
        archive: Arc<dyn ItemArchive>,
        directory: Arc<dyn ReviewerDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            states,
            task_sets,
            tasks,
            queue,
            archive,
            directory,
            notifier,
        }
    }

    fn flow_step(&self, item: &WorkflowItem) -> Option<FlowStep> {
        let handle = self.archive.handle(&item.collection);
        let set = self.task_sets.for_collection(handle.as_deref());
        set.step(&self.states.name(item.state)).cloned()
    }

    /// Run a step's tasks in order and decide
    fn run_tasks(
        &self,
        item: &WorkflowItem,
        tasks: &[Task],
    ) -> Result<CurationDecision, CurationError> {
        for task in tasks {
            let outcome = self.tasks.run(&task.name, &item.item)?;
            debug!(
                workflow_item = %item.id,
                task = %task.name,
                status = ?outcome.status,
                result = %outcome.result,
                "curation task finished"
            );
            self.notify_contacts(item, task, &outcome);
            match outcome.status {
                TaskStatus::Fail if task.has_power(Power::Reject) => {
                    return Ok(CurationDecision::Rejected {
                        reason: format!("{}: {}", task.name, outcome.result),
                    });
                }
                TaskStatus::Success if task.has_power(Power::Approve) => {
                    return Ok(CurationDecision::Proceed);
                }
                _ => {}
            }
        }
        Ok(CurationDecision::Proceed)
    }

    fn resolve_contacts(&self, item: &WorkflowItem, contacts: &[String]) -> Vec<String> {
        let mut emails = Vec::new();
        for contact in contacts {
            let found: Vec<String> = match contact.as_str() {
                FLOW_GROUP => item
                    .state
                    .step()
                    .and_then(|step| self.directory.step_group(&item.collection, step))
                    .map(|group| self.directory.members(&group))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|a| a.email)
                    .collect(),
                COLLECTION_ADMIN => self
                    .directory
                    .collection_admins(&item.collection)
                    .into_iter()
                    .map(|a| a.email)
                    .collect(),
                SITE_ADMIN => self
                    .directory
                    .site_admins()
                    .into_iter()
                    .map(|a| a.email)
                    .collect(),
                address => vec![address.to_string()],
            };
            for email in found {
                if !emails.contains(&email) {
                    emails.push(email);
                }
            }
        }
        emails
    }

    fn notify_contacts(&self, item: &WorkflowItem, task: &Task, outcome: &TaskOutcome) {
        let recipients = self.resolve_contacts(item, task.contacts_for(outcome.status));
        if recipients.is_empty() {
            return;
        }
        let submitter = item
            .submitter
            .and_then(|id| self.directory.actor(&id))
            .map(|a| a.full_name.unwrap_or(a.email))
            .unwrap_or_else(|| "Unknown".to_string());
        let action = match outcome.status {
            TaskStatus::Fail if task.has_power(Power::Reject) => "rejected",
            TaskStatus::Success if task.has_power(Power::Approve) => "approved",
            _ => "none",
        };
        let args = vec![
            self.archive.title(&item.item).unwrap_or_else(|| "Untitled".into()),
            self.archive.title(&item.collection).unwrap_or_default(),
            submitter,
            task.name.clone(),
            outcome.result.clone(),
            action.to_string(),
        ];
        if let Err(e) = self
            .notifier
            .send(Template::FlowtaskNotify, &recipients, &args)
        {
            warn!(workflow_item = %item.id, task = %task.name, error = %e, "curation notification failed");
        }
    }

    /// Run everything waiting on `queue`, then advance or reject each item
    /// through `machine`. Items that left review meanwhile are skipped.
    ///
    /// A failing entry is put back on the queue and the rest of the batch
    /// still runs.
    pub fn process_queue(
        &self,
        queue: &str,
        machine: &WorkflowStateMachine,
    ) -> WorkflowResult<QueueRun> {
        let mut run = QueueRun::default();
        for entry in self.queue.dequeue_all(queue)? {
            match self.curate_entry(&entry, machine) {
                Ok(true) => run.processed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        workflow_item = %entry.workflow_item,
                        queue,
                        error = %e,
                        "queued curation failed; requeueing"
                    );
                    run.requeued.push(entry.workflow_item);
                    if let Err(e) = self.queue.enqueue(queue, entry) {
                        warn!(queue, error = %e, "could not requeue curation entry");
                    }
                }
            }
        }
        info!(
            queue,
            processed = run.processed,
            requeued = run.requeued.len(),
            "curation queue processed"
        );
        Ok(run)
    }

    /// Returns false when the item is no longer in review
    fn curate_entry(
        &self,
        entry: &QueuedCuration,
        machine: &WorkflowStateMachine,
    ) -> WorkflowResult<bool> {
        let Some(mut item) = machine.find_item(&entry.workflow_item)? else {
            debug!(workflow_item = %entry.workflow_item, "queued item left review; skipping");
            return Ok(false);
        };
        let tasks: Vec<Task> = match self.flow_step(&item) {
            Some(step) => step
                .tasks
                .into_iter()
                .filter(|t| entry.tasks.contains(&t.name))
                .collect(),
            None => Vec::new(),
        };
        match self.run_tasks(&item, &tasks)? {
            CurationDecision::Rejected { reason } => {
                machine.reject_after_curation(item, &reason)?;
            }
            _ => {
                machine.advance_with(&mut item, None, AdvanceOptions::without_curation())?;
            }
        }
        Ok(true)
    }
}

impl CurationGate for WorkflowCurator {
    fn needs_curation(&self, item: &WorkflowItem) -> bool {
        self.flow_step(item).is_some()
    }

    fn run_curation(&self, item: &WorkflowItem) -> Result<CurationDecision, CurationError> {
        let Some(step) = self.flow_step(item) else {
            return Ok(CurationDecision::Proceed);
        };
        if let Some(queue) = &step.queue {
            self.queue.enqueue(
                queue,
                QueuedCuration {
                    workflow_item: item.id,
                    tasks: step.tasks.iter().map(|t| t.name.clone()).collect(),
                    queued_at: Utc::now(),
                },
            )?;
            info!(workflow_item = %item.id, queue = %queue, "curation deferred to queue");
            return Ok(CurationDecision::Deferred);
        }
        self.run_tasks(item, &step.tasks)
    }
}
