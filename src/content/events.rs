//! Content events emitted when repository objects change
//!
//! One event per mutation. Subscribers receive them in commit order
//! and must not assume the subject still exists when the event is read.

use super::entity::{EntityId, ObjectType};
use serde::{Deserialize, Serialize};

/// Detail attached to an item modification that withdrew it
pub const WITHDRAW_DETAIL: &str = "WITHDRAW";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Create,
    Modify,
    ModifyMetadata,
    Add,
    Remove,
    Delete,
    Install,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Modify => "MODIFY",
            Self::ModifyMetadata => "MODIFY_METADATA",
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Delete => "DELETE",
            Self::Install => "INSTALL",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change notification.
///
/// For `Delete`, `detail` carries the handle the object had and `identifiers`
/// its external identifiers, since the object itself is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEvent {
    pub event_type: EventType,
    pub subject_type: ObjectType,
    pub subject_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub identifiers: Vec<String>,
}

impl ContentEvent {
    pub fn new(event_type: EventType, subject_type: ObjectType, subject_id: EntityId) -> Self {
        Self {
            event_type,
            subject_type,
            subject_id,
            detail: None,
            identifiers: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_identifiers(mut self, identifiers: Vec<String>) -> Self {
        self.identifiers = identifiers;
        self
    }

    /// An item modification carrying the withdraw marker
    pub fn is_withdrawal(&self) -> bool {
        self.subject_type == ObjectType::Item
            && self.event_type == EventType::Modify
            && self.detail.as_deref() == Some(WITHDRAW_DETAIL)
    }
}

impl std::fmt::Display for ContentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.event_type, self.subject_type, self.subject_id)?;
        if let Some(detail) = &self.detail {
            write!(f, " [{}]", detail)?;
        }
        Ok(())
    }
}
