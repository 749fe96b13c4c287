//! The review workflow state machine
//!
//! Every state change goes through [`WorkflowStateMachine::do_state`], which
//! fires exactly one [`WorkflowEvent`] per call. Pools with no reviewers are
//! passed straight through (skip-ahead) without curation or provenance.
//!
//! Transitions are synchronous and meant to run inside one unit of work per
//! call. Lost updates are caught by the store's version check and surface as
//! [`WorkflowError::ConcurrentModification`].

use super::error::{WorkflowError, WorkflowResult};
use super::events::{WorkflowEvent, WorkflowEventListener};
use super::item::{Draft, WorkflowItem, WorkflowItemId};
use super::provenance;
use super::services::{ItemArchive, WorkflowStore};
use super::state::{WorkflowState, WorkflowStates};
use crate::config::WorkflowSettings;
use crate::content::EntityId;
use crate::curation::{CurationDecision, CurationGate, NoCuration};
use crate::identity::{AccessDenied, Actor, AuthorizationOracle, GroupId, ReviewerDirectory};
use crate::notify::{Notifier, Template};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Switches for one call to [`WorkflowStateMachine::advance_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOptions {
    /// Consult the curation gate first
    pub curate: bool,
    /// Record approval provenance when leaving a claimed step
    pub record: bool,
    /// Do not announce new pool tasks to reviewers
    pub suppress_notification: bool,
}

impl Default for AdvanceOptions {
    fn default() -> Self {
        Self {
            curate: true,
            record: true,
            suppress_notification: false,
        }
    }
}

impl AdvanceOptions {
    pub fn without_curation() -> Self {
        Self {
            curate: false,
            ..Self::default()
        }
    }

    pub fn without_provenance(mut self) -> Self {
        self.record = false;
        self
    }

    pub fn suppressing_notification(mut self) -> Self {
        self.suppress_notification = true;
        self
    }
}

pub struct WorkflowStateMachine {
    states: WorkflowStates,
    settings: WorkflowSettings,
    store: Arc<dyn WorkflowStore>,
    directory: Arc<dyn ReviewerDirectory>,
    auth: Arc<dyn AuthorizationOracle>,
    archive: Arc<dyn ItemArchive>,
    notifier: Arc<dyn Notifier>,
    gate: Arc<dyn CurationGate>,
    listeners: Vec<Arc<dyn WorkflowEventListener>>,
}

impl WorkflowStateMachine {
    pub fn new(
        settings: WorkflowSettings,
        store: Arc<dyn WorkflowStore>,
        directory: Arc<dyn ReviewerDirectory>,
        auth: Arc<dyn AuthorizationOracle>,
        archive: Arc<dyn ItemArchive>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            states: WorkflowStates::new(settings.steps),
            settings,
            store,
            directory,
            auth,
            archive,
            notifier,
            gate: Arc::new(NoCuration),
            listeners: Vec::new(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn CurationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn WorkflowEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn states(&self) -> WorkflowStates {
        self.states
    }

    pub fn find_item(&self, id: &WorkflowItemId) -> WorkflowResult<Option<WorkflowItem>> {
        self.store.find_item(id)
    }

    /// Load an item, failing when it is no longer in review
    pub fn item(&self, id: &WorkflowItemId) -> WorkflowResult<WorkflowItem> {
        self.store.find_item(id)?.ok_or(WorkflowError::ItemNotFound(*id))
    }

    // --- Entry points ---

    /// Move a draft into review and advance it out of SUBMIT
    pub fn start(&self, draft: Draft) -> WorkflowResult<WorkflowItem> {
        self.start_with(draft, AdvanceOptions::default())
    }

    /// `start` without announcing the first pool to its reviewers
    pub fn start_without_notify(&self, draft: Draft) -> WorkflowResult<WorkflowItem> {
        self.start_with(draft, AdvanceOptions::default().suppressing_notification())
    }

    fn start_with(&self, draft: Draft, options: AdvanceOptions) -> WorkflowResult<WorkflowItem> {
        self.store.delete_draft(&draft.id)?;

        let submitter = draft.submitter.and_then(|id| self.directory.actor(&id));
        let statement = provenance::submitted(
            submitter.as_ref(),
            Utc::now(),
            &self.archive.bitstreams(&draft.item),
        );
        self.archive.add_provenance(&draft.item, &statement)?;

        let mut item = WorkflowItem::from_draft(&draft);
        self.store.insert_item(&item)?;
        info!(
            workflow_item = %item.id,
            item = %item.item,
            collection = %item.collection,
            "workflow started"
        );

        self.advance_with(&mut item, submitter.as_ref(), options)?;
        Ok(item)
    }

    /// Take a pooled task
    ///
    /// Outside a pool state the call is logged and ignored.
    pub fn claim(&self, item: &mut WorkflowItem, actor: &Actor) -> WorkflowResult<()> {
        let WorkflowState::Pool(step) = item.state else {
            warn!(
                workflow_item = %item.id,
                state = %self.states.name(item.state),
                actor = %actor.email,
                "claim ignored: item is not in a pool"
            );
            return Ok(());
        };
        self.do_state(item, WorkflowState::Claimed(step), Some(actor), AdvanceOptions::default())?;
        info!(workflow_item = %item.id, step, actor = %actor.email, "task claimed");
        Ok(())
    }

    /// Hand a claimed task back to its pool
    ///
    /// Outside a claimed state the call is logged and ignored.
    pub fn unclaim(&self, item: &mut WorkflowItem, actor: &Actor) -> WorkflowResult<()> {
        let WorkflowState::Claimed(step) = item.state else {
            warn!(
                workflow_item = %item.id,
                state = %self.states.name(item.state),
                actor = %actor.email,
                "unclaim ignored: item is not claimed"
            );
            return Ok(());
        };
        self.do_state(item, WorkflowState::Pool(step), Some(actor), AdvanceOptions::default())?;
        info!(workflow_item = %item.id, step, actor = %actor.email, "task returned to pool");
        Ok(())
    }

    /// Approve and move forward with curation and provenance on
    pub fn advance(&self, item: &mut WorkflowItem, actor: Option<&Actor>) -> WorkflowResult<bool> {
        self.advance_with(item, actor, AdvanceOptions::default())
    }

    /// Approve the current state and move to the next one
    ///
    /// From a pool the acting reviewer first claims the task, so approving
    /// a whole workflow takes two calls per step. Returns whether the item
    /// reached ARCHIVE during this call.
    pub fn advance_with(
        &self,
        item: &mut WorkflowItem,
        actor: Option<&Actor>,
        options: AdvanceOptions,
    ) -> WorkflowResult<bool> {
        if let WorkflowState::Pool(step) = item.state {
            let actor = actor.ok_or(WorkflowError::ActorRequired("advance from a pool"))?;
            return self.do_state(item, WorkflowState::Claimed(step), Some(actor), options);
        }

        // step rights come before curation so an outsider cannot queue or reject
        if let (WorkflowState::Claimed(step), Some(actor)) = (item.state, actor) {
            self.authorize_step(actor, item, step)?;
        }

        if options.curate && self.gate.needs_curation(item) {
            match self.gate.run_curation(item)? {
                CurationDecision::Proceed => {}
                CurationDecision::Deferred => {
                    info!(workflow_item = %item.id, "advance deferred by curation");
                    return Ok(false);
                }
                CurationDecision::Rejected { reason } => {
                    info!(workflow_item = %item.id, reason = %reason, "curation rejected item");
                    self.reject_unchecked(item, None, &reason)?;
                    return Ok(false);
                }
            }
        }

        if let WorkflowState::Claimed(step) = item.state {
            // the last step is editorial and records nothing
            if options.record && step < self.states.steps() {
                let statement = provenance::approved(
                    actor,
                    Utc::now(),
                    &self.archive.bitstreams(&item.item),
                );
                self.archive.add_provenance(&item.item, &statement)?;
            }
        }

        let next = self
            .states
            .next_after_approval(item.state)
            .ok_or_else(|| WorkflowError::InvalidState {
                operation: "advance",
                state: self.states.name(item.state),
            })?;
        let archived = self.do_state(item, next, actor, options)?;
        debug!(
            workflow_item = %item.id,
            state = %self.states.name(item.state),
            archived,
            "advanced"
        );
        Ok(archived)
    }

    /// Send an item back to its submitter as a draft
    ///
    /// Valid from SUBMIT, pool and claimed states.
    pub fn reject(
        &self,
        item: WorkflowItem,
        actor: Option<&Actor>,
        reason: &str,
    ) -> WorkflowResult<Draft> {
        if item.state == WorkflowState::Archive {
            return Err(WorkflowError::InvalidState {
                operation: "reject",
                state: self.states.name(item.state),
            });
        }
        if let (Some(actor), Some(step)) = (actor, item.state.step()) {
            self.authorize_step(actor, &item, step)?;
        }
        self.reject_unchecked(&item, actor, reason)
    }

    /// Reject on behalf of a curation task run outside an advance
    pub fn reject_after_curation(&self, item: WorkflowItem, reason: &str) -> WorkflowResult<Draft> {
        self.reject_unchecked(&item, None, reason)
    }

    /// Administrative removal from review; no reason is sent
    pub fn abort(&self, item: WorkflowItem, actor: &Actor) -> WorkflowResult<Draft> {
        if !self.auth.is_admin(&actor.id) {
            return Err(AccessDenied::new(actor.label(), "abort workflow", item.item.to_string()).into());
        }
        let old_state = item.state;
        let draft = self.return_to_draft(&item)?;
        self.store.delete_tasks(&item.id)?;
        self.fire(&item, Some(actor), old_state, WorkflowState::Submit, None, None, false);
        info!(workflow_item = %item.id, actor = %actor.email, "workflow aborted");
        Ok(draft)
    }

    // --- Queries and maintenance ---

    /// Items the actor has claimed
    pub fn owned_tasks(&self, actor: &Actor) -> WorkflowResult<Vec<WorkflowItem>> {
        self.store.items_owned_by(&actor.id)
    }

    /// Items waiting in pools the actor belongs to
    pub fn pooled_tasks(&self, actor: &Actor) -> WorkflowResult<Vec<WorkflowItem>> {
        let mut items = Vec::new();
        for task in self.store.tasks_for_actor(&actor.id)? {
            if let Some(item) = self.store.find_item(&task.workflow_item)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Tables still referencing `actor`; deleting the actor is blocked
    /// while this is non-empty
    pub fn delete_constraints(&self, actor: &Actor) -> WorkflowResult<Vec<&'static str>> {
        let mut constraints = Vec::new();
        if !self.store.items_submitted_by(&actor.id)?.is_empty() {
            constraints.push("workflowitem");
        }
        if !self.store.tasks_for_actor(&actor.id)?.is_empty() {
            constraints.push("tasklistitem");
        }
        Ok(constraints)
    }

    /// Drop a collection's step groups and every item it has in review.
    /// Returns how many items were removed.
    pub fn delete_collection(&self, actor: &Actor, collection: &EntityId) -> WorkflowResult<usize> {
        if !self.auth.is_admin(&actor.id) {
            return Err(AccessDenied::new(actor.label(), "delete collection", collection.to_string()).into());
        }
        self.directory.clear_step_groups(collection);
        let items = self.store.items_in_collection(collection)?;
        for item in &items {
            self.store.delete_tasks(&item.id)?;
            self.store.delete_item(item)?;
        }
        info!(collection = %collection, removed = items.len(), "collection workflow removed");
        Ok(items.len())
    }

    // --- Transitions ---

    /// The single transition function. Returns whether the item was archived.
    pub fn do_state(
        &self,
        item: &mut WorkflowItem,
        new_state: WorkflowState,
        actor: Option<&Actor>,
        options: AdvanceOptions,
    ) -> WorkflowResult<bool> {
        if !self.states.contains(new_state) {
            return Err(WorkflowError::InvalidState {
                operation: "enter",
                state: format!("{:?}", new_state),
            });
        }
        match new_state {
            WorkflowState::Pool(step) => self.enter_pool(item, step, actor, options),
            WorkflowState::Claimed(step) => {
                let actor = actor.ok_or(WorkflowError::ActorRequired("claim"))?;
                self.assign(item, step, actor)?;
                Ok(false)
            }
            WorkflowState::Archive => self.enter_archive(item, actor),
            WorkflowState::Submit => Err(WorkflowError::InvalidState {
                operation: "enter SUBMIT",
                state: self.states.name(item.state),
            }),
        }
    }

    fn enter_pool(
        &self,
        item: &mut WorkflowItem,
        step: u8,
        actor: Option<&Actor>,
        options: AdvanceOptions,
    ) -> WorkflowResult<bool> {
        let old_state = item.state;
        let returned = old_state == WorkflowState::Claimed(step) && item.owner.is_some();
        let group = self.directory.step_group(&item.collection, step);
        let members = group
            .map(|g| self.directory.members(&g))
            .unwrap_or_default();

        if members.is_empty() {
            debug!(workflow_item = %item.id, step, "pool has no reviewers; skipping ahead");
            self.commit(item, |next| {
                next.state = WorkflowState::Claimed(step);
                next.owner = None;
            })?;
            self.fire(item, actor, old_state, WorkflowState::Pool(step), None, group, true);
            let options = AdvanceOptions {
                curate: false,
                record: false,
                suppress_notification: options.suppress_notification,
            };
            return self.advance_with(item, None, options);
        }

        self.commit(item, |next| {
            next.state = WorkflowState::Pool(step);
            next.owner = None;
        })?;
        for member in &members {
            self.store.create_task(&item.id, &member.id)?;
        }

        if options.suppress_notification {
            debug!(workflow_item = %item.id, step, "pool notification suppressed");
        } else if returned && !self.settings.notify_returned_tasks {
            debug!(workflow_item = %item.id, step, "returned task not re-announced");
        } else {
            self.notify_pool(item, step, &members);
        }

        self.fire(item, actor, old_state, WorkflowState::Pool(step), None, group, false);
        Ok(false)
    }

    fn assign(&self, item: &mut WorkflowItem, step: u8, actor: &Actor) -> WorkflowResult<()> {
        self.authorize_step(actor, item, step)?;
        let old_state = item.state;
        self.commit(item, |next| {
            next.state = WorkflowState::Claimed(step);
            next.owner = Some(actor.id);
        })?;
        self.store.delete_tasks(&item.id)?;
        self.fire(item, Some(actor), old_state, item.state, item.owner, None, false);
        Ok(())
    }

    fn enter_archive(&self, item: &mut WorkflowItem, actor: Option<&Actor>) -> WorkflowResult<bool> {
        let old_state = item.state;
        self.commit(item, |next| {
            next.state = WorkflowState::Archive;
            next.owner = None;
        })?;
        self.store.delete_tasks(&item.id)?;
        self.archive.install(&item.item, &item.collection)?;
        self.notify_archived(item);
        self.store.delete_item(item)?;
        self.fire(item, actor, old_state, WorkflowState::Archive, None, None, false);
        info!(workflow_item = %item.id, item = %item.item, "item archived");
        Ok(true)
    }

    /// Saves `change` applied to a copy; `item` only takes the new state
    /// once the store accepted it
    fn commit(
        &self,
        item: &mut WorkflowItem,
        change: impl FnOnce(&mut WorkflowItem),
    ) -> WorkflowResult<()> {
        let mut next = item.clone();
        change(&mut next);
        self.store.save_item(&mut next)?;
        *item = next;
        Ok(())
    }

    fn reject_unchecked(
        &self,
        item: &WorkflowItem,
        actor: Option<&Actor>,
        reason: &str,
    ) -> WorkflowResult<Draft> {
        let old_state = item.state;
        let draft = self.return_to_draft(item)?;
        self.store.delete_tasks(&item.id)?;
        let statement = provenance::rejected(actor, reason, Utc::now());
        self.archive.add_provenance(&item.item, &statement)?;
        self.notify_rejected(item, actor, reason);
        self.fire(item, actor, old_state, WorkflowState::Submit, None, None, false);
        info!(
            workflow_item = %item.id,
            item = %item.item,
            reason = %reason,
            "item rejected"
        );
        Ok(draft)
    }

    fn return_to_draft(&self, item: &WorkflowItem) -> WorkflowResult<Draft> {
        self.store.delete_item(item)?;
        let draft = item.to_draft();
        self.store.insert_draft(&draft)?;
        Ok(draft)
    }

    /// Checks step rights only when the step has a reviewer group
    fn authorize_step(&self, actor: &Actor, item: &WorkflowItem, step: u8) -> WorkflowResult<()> {
        let Some(group) = self.directory.step_group(&item.collection, step) else {
            return Ok(());
        };
        if self.directory.members(&group).is_empty()
            || self.auth.can_review(&actor.id, &item.collection, step)
        {
            return Ok(());
        }
        Err(AccessDenied::new(
            actor.label(),
            format!("perform review step {}", step),
            item.item.to_string(),
        )
        .into())
    }

    #[allow(clippy::too_many_arguments)]
    fn fire(
        &self,
        item: &WorkflowItem,
        actor: Option<&Actor>,
        old_state: WorkflowState,
        new_state: WorkflowState,
        owner: Option<crate::identity::ActorId>,
        group: Option<GroupId>,
        skipped: bool,
    ) {
        let event = WorkflowEvent {
            workflow_item: item.id,
            item: item.item,
            collection: item.collection,
            actor: actor.map(|a| a.id),
            old_state: self.states.name(old_state),
            new_state: self.states.name(new_state),
            owner: if new_state.is_claimed() { owner } else { None },
            group,
            skipped,
        };
        debug!(
            workflow_item = %event.workflow_item,
            old_state = %event.old_state,
            new_state = %event.new_state,
            skipped,
            "workflow transition"
        );
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    // --- Notifications (best effort) ---

    fn submitter_name(&self, item: &WorkflowItem) -> String {
        item.submitter
            .and_then(|id| self.directory.actor(&id))
            .map(|a| a.full_name.unwrap_or(a.email))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn titles(&self, item: &WorkflowItem) -> (String, String) {
        (
            self.archive
                .title(&item.item)
                .unwrap_or_else(|| "Untitled".to_string()),
            self.archive.title(&item.collection).unwrap_or_default(),
        )
    }

    fn send(&self, item: &WorkflowItem, template: Template, recipients: &[String], args: &[String]) {
        if let Err(e) = self.notifier.send(template, recipients, args) {
            warn!(workflow_item = %item.id, template = %template, error = %e, "notification failed");
        }
    }

    fn notify_pool(&self, item: &WorkflowItem, step: u8, members: &[Actor]) {
        let (title, collection) = self.titles(item);
        let args = vec![
            title,
            collection,
            self.submitter_name(item),
            self.settings.step_message(step),
            self.settings.task_list_link(),
        ];
        for member in members {
            self.send(item, Template::SubmitTask, &[member.email.clone()], &args);
        }
    }

    fn notify_archived(&self, item: &WorkflowItem) {
        let Some(submitter) = item.submitter.and_then(|id| self.directory.actor(&id)) else {
            debug!(workflow_item = %item.id, "no submitter to notify of archive");
            return;
        };
        let (title, collection) = self.titles(item);
        let link = self
            .archive
            .handle(&item.item)
            .map(|h| self.settings.handle_link(&h))
            .unwrap_or_default();
        self.send(
            item,
            Template::SubmitArchive,
            &[submitter.email],
            &[title, collection, link],
        );
    }

    fn notify_rejected(&self, item: &WorkflowItem, actor: Option<&Actor>, reason: &str) {
        let Some(submitter) = item.submitter.and_then(|id| self.directory.actor(&id)) else {
            debug!(workflow_item = %item.id, "no submitter to notify of rejection");
            return;
        };
        let (title, collection) = self.titles(item);
        let rejector = actor
            .map(|a| a.full_name.clone().unwrap_or_else(|| a.email.clone()))
            .unwrap_or_else(|| "Unknown".to_string());
        self.send(
            item,
            Template::SubmitReject,
            &[submitter.email],
            &[
                title,
                collection,
                rejector,
                reason.to_string(),
                self.settings.task_list_link(),
            ],
        );
    }
}
