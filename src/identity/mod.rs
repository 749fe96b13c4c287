//! People, groups and permission checks

mod directory;
mod types;

pub use directory::{AccessDenied, AuthorizationOracle, MemoryDirectory, ReviewerDirectory};
pub use types::{Actor, ActorId, Group, GroupId};
