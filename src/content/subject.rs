//! Subject identifiers: the independently published repository objects

use super::entity::{Entity, EntityId, ObjectType};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors raised when an object cannot stand as a subject
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubjectError {
    #[error("{0} objects cannot be published as independent subjects")]
    IllegalSubjectKind(ObjectType),
}

/// Kinds of object that are published as their own named graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Site,
    Community,
    Collection,
    Item,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        ObjectType::from(*self).as_str()
    }
}

impl TryFrom<ObjectType> for SubjectKind {
    type Error = SubjectError;

    fn try_from(value: ObjectType) -> Result<Self, Self::Error> {
        match value {
            ObjectType::Site => Ok(Self::Site),
            ObjectType::Community => Ok(Self::Community),
            ObjectType::Collection => Ok(Self::Collection),
            ObjectType::Item => Ok(Self::Item),
            other => Err(SubjectError::IllegalSubjectKind(other)),
        }
    }
}

impl From<SubjectKind> for ObjectType {
    fn from(kind: SubjectKind) -> Self {
        match kind {
            SubjectKind::Site => ObjectType::Site,
            SubjectKind::Community => ObjectType::Community,
            SubjectKind::Collection => ObjectType::Collection,
            SubjectKind::Item => ObjectType::Item,
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one subject, carrying enough to address it after deletion.
///
/// Equality and hashing use `id` only: two identifiers for the same object
/// collapse in the pending queues even if one was built from a delete event
/// and carries a different handle snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectIdentifier {
    pub kind: SubjectKind,
    pub id: EntityId,
    pub handle: Option<String>,
    #[serde(default)]
    pub external_identifiers: Vec<String>,
}

impl SubjectIdentifier {
    pub fn new(kind: SubjectKind, id: EntityId) -> Self {
        Self {
            kind,
            id,
            handle: None,
            external_identifiers: Vec::new(),
        }
    }

    pub fn with_handle(mut self, handle: Option<String>) -> Self {
        self.handle = handle;
        self
    }

    pub fn with_external_identifiers(mut self, identifiers: Vec<String>) -> Self {
        self.external_identifiers = identifiers;
        self
    }

    /// Build an identifier for an object of a given type.
    ///
    /// Fails for bundles, bitstreams and any other non-subject kind.
    pub fn for_object(object_type: ObjectType, id: EntityId) -> Result<Self, SubjectError> {
        Ok(Self::new(SubjectKind::try_from(object_type)?, id))
    }

    /// Snapshot an entity's addressing data
    pub fn from_entity(entity: &Entity) -> Result<Self, SubjectError> {
        Ok(Self::for_object(entity.object_type, entity.id)?
            .with_handle(entity.handle.clone())
            .with_external_identifiers(entity.external_identifiers.clone()))
    }
}

impl PartialEq for SubjectIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubjectIdentifier {}

impl Hash for SubjectIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for SubjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.handle {
            Some(handle) => write!(f, "{} {} (hdl:{})", self.kind, self.id, handle),
            None => write!(f, "{} {}", self.kind, self.id),
        }
    }
}
