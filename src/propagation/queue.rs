//! Deduplicating pending queues
//!
//! Two ordered, duplicate-free queues: subjects to convert and subjects to
//! delete. A subject queued for deletion is never converted in the same
//! drain, and enqueuing a deletion cancels any pending conversion.

use crate::content::SubjectIdentifier;
use std::collections::{HashSet, VecDeque};

/// Insertion-ordered set of subjects
#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    order: VecDeque<SubjectIdentifier>,
    members: HashSet<SubjectIdentifier>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless already present; returns whether it was added
    pub fn push_back(&mut self, subject: SubjectIdentifier) -> bool {
        if self.members.contains(&subject) {
            return false;
        }
        self.members.insert(subject.clone());
        self.order.push_back(subject);
        true
    }

    pub fn pop_front(&mut self) -> Option<SubjectIdentifier> {
        let subject = self.order.pop_front()?;
        self.members.remove(&subject);
        Some(subject)
    }

    pub fn remove(&mut self, subject: &SubjectIdentifier) -> bool {
        if !self.members.remove(subject) {
            return false;
        }
        self.order.retain(|s| s != subject);
        true
    }

    pub fn contains(&self, subject: &SubjectIdentifier) -> bool {
        self.members.contains(subject)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectIdentifier> {
        self.order.iter()
    }

    /// Lazily pop from the front until empty
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { queue: self }
    }
}

/// FIFO draining iterator over a `PendingQueue`
#[derive(Debug)]
pub struct Drain<'a> {
    queue: &'a mut PendingQueue,
}

impl Iterator for Drain<'_> {
    type Item = SubjectIdentifier;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }
}

/// The convert and delete queues of one activation
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    to_convert: PendingQueue,
    to_delete: PendingQueue,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a conversion; no-op if the subject is already queued either way
    pub fn enqueue_convert(&mut self, subject: SubjectIdentifier) -> bool {
        if self.to_delete.contains(&subject) {
            return false;
        }
        self.to_convert.push_back(subject)
    }

    /// Queue a deletion, cancelling any pending conversion
    pub fn enqueue_delete(&mut self, subject: SubjectIdentifier) -> bool {
        self.to_convert.remove(&subject);
        self.to_delete.push_back(subject)
    }

    pub fn pop_convert(&mut self) -> Option<SubjectIdentifier> {
        self.to_convert.pop_front()
    }

    pub fn drain_delete(&mut self) -> Drain<'_> {
        self.to_delete.drain()
    }

    pub fn is_queued_for_delete(&self, subject: &SubjectIdentifier) -> bool {
        self.to_delete.contains(subject)
    }

    pub fn to_convert(&self) -> &PendingQueue {
        &self.to_convert
    }

    pub fn to_delete(&self) -> &PendingQueue {
        &self.to_delete
    }

    pub fn is_empty(&self) -> bool {
        self.to_convert.is_empty() && self.to_delete.is_empty()
    }
}
