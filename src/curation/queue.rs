//! Queues for curation deferred to an asynchronous worker

use super::gate::CurationError;
use crate::workflow::WorkflowItemId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

/// One item waiting for its tasks to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCuration {
    pub workflow_item: WorkflowItemId,
    pub tasks: Vec<String>,
    pub queued_at: DateTime<Utc>,
}

pub trait CurationQueue: Send + Sync {
    fn enqueue(&self, queue: &str, entry: QueuedCuration) -> Result<(), CurationError>;

    /// Remove and return everything waiting on `queue`, oldest first
    fn dequeue_all(&self, queue: &str) -> Result<Vec<QueuedCuration>, CurationError>;
}

#[derive(Debug, Default)]
pub struct MemoryCurationQueue {
    queues: DashMap<String, VecDeque<QueuedCuration>>,
}

impl MemoryCurationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }
}

impl CurationQueue for MemoryCurationQueue {
    fn enqueue(&self, queue: &str, entry: QueuedCuration) -> Result<(), CurationError> {
        if queue.trim().is_empty() {
            return Err(CurationError::Queue("queue name is empty".into()));
        }
        self.queues
            .entry(queue.to_string())
            .or_default()
            .push_back(entry);
        Ok(())
    }

    fn dequeue_all(&self, queue: &str) -> Result<Vec<QueuedCuration>, CurationError> {
        Ok(self
            .queues
            .remove(queue)
            .map(|(_, q)| q.into_iter().collect())
            .unwrap_or_default())
    }
}
