//! Outbound notifications
//!
//! Delivery is a collaborator concern. The workflow machine only picks a
//! template, a recipient list and positional arguments.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("notification {0} has no recipients")]
    NoRecipients(Template),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Message templates known to the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// A task entered a reviewer pool.
    /// Args: title, collection, submitter, step message, task list link
    SubmitTask,
    /// The item was archived. Args: title, collection, handle link
    SubmitArchive,
    /// The item was rejected.
    /// Args: title, collection, rejector, reason, task list link
    SubmitReject,
    /// A curation task reported.
    /// Args: title, collection, submitter, task, message, action
    FlowtaskNotify,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitTask => "submit_task",
            Self::SubmitArchive => "submit_archive",
            Self::SubmitReject => "submit_reject",
            Self::FlowtaskNotify => "flowtask_notify",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Notifier: Send + Sync {
    fn send(&self, template: Template, recipients: &[String], args: &[String]) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, template: Template, recipients: &[String], args: &[String]) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients(template));
        }
        tracing::info!(
            template = template.as_str(),
            recipients = ?recipients,
            args = ?args,
            "notification"
        );
        Ok(())
    }
}
