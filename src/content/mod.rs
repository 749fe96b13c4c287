//! Repository content model: objects, subjects and change events

mod entity;
mod events;
mod store;
mod subject;

pub use entity::{Entity, EntityId, FileInfo, ItemStatus, MetadataValue, ObjectType, PROVENANCE_FIELD};
pub use events::{ContentEvent, EventType, WITHDRAW_DETAIL};
pub use store::{ContentSnapshot, ContentStore, MemoryContentStore};
pub use subject::{SubjectError, SubjectIdentifier, SubjectKind};
