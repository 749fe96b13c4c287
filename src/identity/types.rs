//! People and groups

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a person (an e-person account)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person who submits or reviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub full_name: Option<String>,
    pub email: String,
}

impl Actor {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            full_name: Some(full_name.into()),
            email: email.into(),
        }
    }

    /// An account known only by its address
    pub fn anonymous(email: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            full_name: None,
            email: email.into(),
        }
    }

    /// "Full Name (email)", as written into provenance and notifications
    pub fn label(&self) -> String {
        match &self.full_name {
            Some(name) => format!("{} ({})", name, self.email),
            None => format!("({})", self.email),
        }
    }
}

/// A named set of people, possibly nesting other groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<ActorId>,
    #[serde(default)]
    pub subgroups: Vec<GroupId>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            members: Vec::new(),
            subgroups: Vec::new(),
        }
    }

    pub fn with_member(mut self, actor: ActorId) -> Self {
        if !self.members.contains(&actor) {
            self.members.push(actor);
        }
        self
    }

    pub fn with_subgroup(mut self, group: GroupId) -> Self {
        self.subgroups.push(group);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_name_and_email() {
        let actor = Actor::new("Ada Lovelace", "ada@example.org");
        assert_eq!(actor.label(), "Ada Lovelace (ada@example.org)");
    }

    #[test]
    fn label_without_name() {
        let actor = Actor::anonymous("bot@example.org");
        assert_eq!(actor.label(), "(bot@example.org)");
    }
}
