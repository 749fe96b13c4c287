//! Shared fixtures for the workflow and propagation scenarios
//!
//! `Repository` wires the in-memory collaborators together around one
//! site, community and collection.

#![allow(dead_code)]

use accession::config::WorkflowSettings;
use accession::content::{Entity, EntityId, MemoryContentStore, ObjectType};
use accession::identity::{Actor, Group, MemoryDirectory};
use accession::notify::{Notifier, NotifyError, Template};
use accession::workflow::{
    Draft, MemoryWorkflowStore, WorkflowEventLog, WorkflowStateMachine, WorkflowStore,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub template: Template,
    pub recipients: Vec<String>,
    pub args: Vec<String>,
}

/// Notifier that remembers what it was asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send after this call fails (and is still recorded)
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_with(&self, template: Template) -> Vec<SentNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.template == template)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(
        &self,
        template: Template,
        recipients: &[String],
        args: &[String],
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentNotification {
                template,
                recipients: recipients.to_vec(),
                args: args.to_vec(),
            });
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("smtp unavailable".into()));
        }
        Ok(())
    }
}

pub struct Repository {
    pub content: Arc<MemoryContentStore>,
    pub directory: Arc<MemoryDirectory>,
    pub workflow: Arc<MemoryWorkflowStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub log: Arc<WorkflowEventLog>,
    pub site: EntityId,
    pub community: EntityId,
    pub collection: EntityId,
}

impl Repository {
    pub fn new() -> Self {
        let content = Arc::new(MemoryContentStore::new());
        let site = Entity::new(ObjectType::Site, "Repository").with_handle("123456789/0");
        let community = Entity::new(ObjectType::Community, "Faculty of Science")
            .with_handle("123456789/1")
            .with_parent(site.id);
        let collection = Entity::new(ObjectType::Collection, "Theses")
            .with_handle("123456789/2")
            .with_parent(community.id);
        let (site_id, community_id, collection_id) = (site.id, community.id, collection.id);
        content.insert(site);
        content.insert(community);
        content.insert(collection);

        Self {
            content,
            directory: Arc::new(MemoryDirectory::new()),
            workflow: Arc::new(MemoryWorkflowStore::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            log: Arc::new(WorkflowEventLog::new()),
            site: site_id,
            community: community_id,
            collection: collection_id,
        }
    }

    pub fn machine(&self, steps: u8) -> WorkflowStateMachine {
        self.machine_with(WorkflowSettings {
            steps,
            base_url: "https://repo.example.org".into(),
            ..WorkflowSettings::default()
        })
    }

    pub fn machine_with(&self, settings: WorkflowSettings) -> WorkflowStateMachine {
        WorkflowStateMachine::new(
            settings,
            self.workflow.clone(),
            self.directory.clone(),
            self.directory.clone(),
            self.content.clone(),
            self.notifier.clone(),
        )
        .with_listener(self.log.clone())
    }

    pub fn actor(&self, name: &str) -> Actor {
        let email = format!("{}@example.org", name.to_lowercase().replace(' ', "."));
        let actor = Actor::new(name, email);
        self.directory.add_actor(actor.clone());
        actor
    }

    pub fn admin(&self, name: &str) -> Actor {
        let actor = self.actor(name);
        self.directory.add_admin(actor.id);
        actor
    }

    /// A reviewer group for `step` with the given members
    pub fn reviewers(&self, step: u8, names: &[&str]) -> Vec<Actor> {
        let actors: Vec<Actor> = names.iter().map(|n| self.actor(n)).collect();
        let group = actors
            .iter()
            .fold(Group::new(format!("Reviewers step {}", step)), |g, a| {
                g.with_member(a.id)
            });
        let group_id = self.directory.add_group(group);
        self.directory.assign_step_group(self.collection, step, group_id);
        actors
    }

    /// A fresh item with an in-progress submission and its draft
    pub fn draft(&self, title: &str, submitter: Option<&Actor>) -> Draft {
        let item = Entity::new(ObjectType::Item, title).with_metadata("dc.title", title);
        let item_id = item.id;
        self.content.insert(item);
        self.content.begin_submission(item_id);
        let draft = Draft::new(item_id, self.collection, submitter.map(|a| a.id));
        self.workflow
            .insert_draft(&draft)
            .expect("memory store accepts drafts");
        draft
    }

    pub fn provenance(&self, item: &EntityId) -> Vec<String> {
        self.content
            .get(item)
            .map(|e| {
                e.metadata_values(accession::content::PROVENANCE_FIELD)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
