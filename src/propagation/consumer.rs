//! Change propagation consumer
//!
//! Folds a batch of content events into the convert and delete queues,
//! then drains them against the external graph store once the batch ends.
//! Queues are scoped to one batch; nothing survives between calls to `end`.

use super::convert::Converter;
use super::queue::Deduplicator;
use crate::content::{
    ContentEvent, ContentStore, EntityId, EventType, ObjectType, SubjectError, SubjectIdentifier,
    SubjectKind,
};
use crate::storage::{GraphStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Systemic failures that abort a drain
#[derive(Debug, Error)]
pub enum PropagationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    IllegalSubject(#[from] SubjectError),
}

/// Access mode of the surrounding unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// The transaction a batch of events was committed in
pub trait UnitOfWork: Send {
    fn mode(&self) -> TxMode;
    fn set_mode(&mut self, mode: TxMode);
}

/// Plain unit of work that only tracks its mode
#[derive(Debug, Default)]
pub struct Transaction {
    mode: TxMode,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitOfWork for Transaction {
    fn mode(&self) -> TxMode {
        self.mode
    }

    fn set_mode(&mut self, mode: TxMode) {
        self.mode = mode;
    }
}

/// What one drain did
#[derive(Debug, Default, Clone)]
pub struct DrainReport {
    pub converted: Vec<SubjectIdentifier>,
    pub deleted: Vec<SubjectIdentifier>,
    /// Subjects left untouched, with the reason
    pub skipped: Vec<(SubjectIdentifier, String)>,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.converted.is_empty() && self.deleted.is_empty() && self.skipped.is_empty()
    }
}

pub struct ChangePropagationConsumer {
    content: Arc<dyn ContentStore>,
    converter: Arc<Converter>,
    store: Arc<dyn GraphStore>,
    pending: Deduplicator,
}

impl ChangePropagationConsumer {
    pub fn new(
        content: Arc<dyn ContentStore>,
        converter: Arc<Converter>,
        store: Arc<dyn GraphStore>,
    ) -> Self {
        Self {
            content,
            converter,
            store,
            pending: Deduplicator::new(),
        }
    }

    /// Queues accumulated since the last drain
    pub fn pending(&self) -> &Deduplicator {
        &self.pending
    }

    /// Classify one event into the pending queues.
    ///
    /// Never fails: unknown combinations and vanished objects are logged.
    pub fn consume(&mut self, event: &ContentEvent) {
        match event.subject_type {
            ObjectType::Bitstream => self.consume_bitstream(event),
            ObjectType::Bundle => self.consume_bundle(event),
            ObjectType::Community => self.consume_container(SubjectKind::Community, event),
            ObjectType::Collection => self.consume_container(SubjectKind::Collection, event),
            ObjectType::Item => self.consume_container(SubjectKind::Item, event),
            ObjectType::Site => self.consume_site(event),
            other => warn!(subject_type = %other, %event, "ignoring event for unsupported subject type"),
        }
    }

    pub fn consume_all<'a>(&mut self, events: impl IntoIterator<Item = &'a ContentEvent>) {
        for event in events {
            self.consume(event);
        }
    }

    fn consume_bitstream(&mut self, event: &ContentEvent) {
        match event.event_type {
            EventType::Modify | EventType::ModifyMetadata => {
                let Some(bitstream) = self.content.find(ObjectType::Bitstream, &event.subject_id) else {
                    debug!(%event, "bitstream vanished before classification");
                    return;
                };
                for bundle_id in &bitstream.parents {
                    if let Some(bundle) = self.content.find(ObjectType::Bundle, bundle_id) {
                        for item_id in &bundle.parents {
                            self.enqueue_owning_item(item_id);
                        }
                    }
                }
            }
            // creation and deletion surface as ADD/REMOVE on the bundle
            EventType::Create | EventType::Delete => {}
            _ => warn!(%event, "ignoring unexpected bitstream event"),
        }
    }

    fn consume_bundle(&mut self, event: &ContentEvent) {
        match event.event_type {
            EventType::Add | EventType::Remove | EventType::Modify | EventType::ModifyMetadata => {
                let Some(bundle) = self.content.find(ObjectType::Bundle, &event.subject_id) else {
                    debug!(%event, "bundle vanished before classification");
                    return;
                };
                for item_id in &bundle.parents {
                    self.enqueue_owning_item(item_id);
                }
            }
            EventType::Create | EventType::Delete => {}
            _ => warn!(%event, "ignoring unexpected bundle event"),
        }
    }

    fn enqueue_owning_item(&mut self, item_id: &EntityId) {
        let Some(item) = self.content.find(ObjectType::Item, item_id) else {
            return;
        };
        if self.content.has_draft_counterpart(item_id) {
            debug!(item = %item_id, "skipping item with in-progress submission");
            return;
        }
        let subject = SubjectIdentifier::new(SubjectKind::Item, item.id)
            .with_handle(item.handle)
            .with_external_identifiers(item.external_identifiers);
        self.pending.enqueue_convert(subject);
    }

    fn consume_container(&mut self, kind: SubjectKind, event: &ContentEvent) {
        match event.event_type {
            EventType::Delete => {
                // the object is gone; address it from what the event carried
                let subject = SubjectIdentifier::new(kind, event.subject_id)
                    .with_handle(event.detail.clone())
                    .with_external_identifiers(event.identifiers.clone());
                self.pending.enqueue_delete(subject);
            }
            EventType::Create
            | EventType::Modify
            | EventType::ModifyMetadata
            | EventType::Add
            | EventType::Remove => {
                let Some(entity) = self.content.find(kind.into(), &event.subject_id) else {
                    debug!(%event, "subject vanished before classification");
                    return;
                };
                if kind == SubjectKind::Item && self.content.has_draft_counterpart(&entity.id) {
                    debug!(%event, "skipping item with in-progress submission");
                    return;
                }
                let subject = SubjectIdentifier::new(kind, entity.id)
                    .with_handle(entity.handle)
                    .with_external_identifiers(entity.external_identifiers);
                if event.is_withdrawal() {
                    self.pending.enqueue_delete(subject);
                } else {
                    self.pending.enqueue_convert(subject);
                }
            }
            EventType::Install => {
                debug!(%event, "install is followed by a modify; nothing to do");
            }
        }
    }

    fn consume_site(&mut self, event: &ContentEvent) {
        match event.event_type {
            EventType::Add | EventType::Remove | EventType::Modify | EventType::ModifyMetadata => {
                match self.content.site() {
                    Some(site) => {
                        let subject = SubjectIdentifier::new(SubjectKind::Site, site.id)
                            .with_handle(site.handle)
                            .with_external_identifiers(site.external_identifiers);
                        self.pending.enqueue_convert(subject);
                    }
                    None => warn!(%event, "site event but no site is configured"),
                }
            }
            _ => warn!(%event, "ignoring unexpected site event"),
        }
    }

    /// Drain the queues at the end of a batch.
    ///
    /// The unit of work is read-only while draining and restored afterwards,
    /// whatever the outcome. Queues are reset even if the drain fails.
    pub async fn end(&mut self, uow: &mut dyn UnitOfWork) -> Result<DrainReport, PropagationError> {
        let previous = uow.mode();
        uow.set_mode(TxMode::ReadOnly);
        let mut pending = std::mem::take(&mut self.pending);
        let result = self.drain(&mut pending).await;
        uow.set_mode(previous);
        result
    }

    async fn drain(&self, pending: &mut Deduplicator) -> Result<DrainReport, PropagationError> {
        let mut report = DrainReport::default();

        while let Some(subject) = pending.pop_convert() {
            if pending.is_queued_for_delete(&subject) {
                debug!(%subject, "skipping conversion, queued for deletion");
                continue;
            }
            match self.converter.convert(&subject) {
                Ok(graph) => {
                    self.store.store(&graph).await?;
                    debug!(%subject, identifier = %graph.identifier, "converted");
                    report.converted.push(subject);
                }
                Err(e) if e.routes_to_deletion() => {
                    info!(%subject, reason = %e, "removing stale representation");
                    pending.enqueue_delete(subject);
                }
                Err(e) => {
                    warn!(%subject, reason = %e, "skipping subject");
                    report.skipped.push((subject, e.to_string()));
                }
            }
        }

        for subject in pending.drain_delete() {
            match self.converter.identifiers().generate_for(&subject) {
                Some(identifier) => {
                    self.store.delete(&identifier).await?;
                    debug!(%subject, %identifier, "deleted");
                    report.deleted.push(subject);
                }
                None => {
                    warn!(%subject, "cannot delete subject without an identifier");
                    report
                        .skipped
                        .push((subject, "no identifier can be generated".to_string()));
                }
            }
        }

        if !report.is_empty() {
            info!(
                converted = report.converted.len(),
                deleted = report.deleted.len(),
                skipped = report.skipped.len(),
                "propagation batch complete"
            );
        }
        Ok(report)
    }
}
