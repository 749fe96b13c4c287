//! Reviewer directory and authorization oracle
//!
//! Both are external collaborators of the workflow machine and the
//! converter. `MemoryDirectory` implements both for tests and the CLI.

use super::types::{Actor, ActorId, Group, GroupId};
use crate::content::{Entity, EntityId};
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use thiserror::Error;

/// An authorization check failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{who} is not permitted to {action} {target}")]
pub struct AccessDenied {
    pub who: String,
    pub action: String,
    pub target: String,
}

impl AccessDenied {
    pub fn new(who: impl Into<String>, action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            who: who.into(),
            action: action.into(),
            target: target.into(),
        }
    }
}

/// Lookup of people and the reviewer groups configured on collections
pub trait ReviewerDirectory: Send + Sync {
    fn actor(&self, id: &ActorId) -> Option<Actor>;

    /// The group assigned to review step `step` (1-based) of a collection
    fn step_group(&self, collection: &EntityId, step: u8) -> Option<GroupId>;

    /// Every person in the group, including members of nested groups
    fn members(&self, group: &GroupId) -> Vec<Actor>;

    fn collection_admins(&self, collection: &EntityId) -> Vec<Actor>;

    fn site_admins(&self) -> Vec<Actor>;

    /// Unassign every review step group of a collection
    fn clear_step_groups(&self, collection: &EntityId);
}

/// Answers permission questions
pub trait AuthorizationOracle: Send + Sync {
    /// Whether `actor` (anonymous when `None`) may read the object
    fn check_readable(&self, actor: Option<&ActorId>, entity: &Entity) -> Result<(), AccessDenied>;

    fn is_admin(&self, actor: &ActorId) -> bool;

    /// Whether `actor` may perform review step `step` on the collection
    fn can_review(&self, actor: &ActorId, collection: &EntityId, step: u8) -> bool;
}

/// In-memory directory with step groups, collection admins and site admins
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    actors: DashMap<ActorId, Actor>,
    groups: DashMap<GroupId, Group>,
    step_groups: DashMap<(EntityId, u8), GroupId>,
    collection_admins: DashMap<EntityId, GroupId>,
    admins: DashSet<ActorId>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&self, actor: Actor) -> ActorId {
        let id = actor.id;
        self.actors.insert(id, actor);
        id
    }

    pub fn add_group(&self, group: Group) -> GroupId {
        let id = group.id;
        self.groups.insert(id, group);
        id
    }

    pub fn add_admin(&self, actor: ActorId) {
        self.admins.insert(actor);
    }

    pub fn assign_step_group(&self, collection: EntityId, step: u8, group: GroupId) {
        self.step_groups.insert((collection, step), group);
    }

    pub fn assign_collection_admins(&self, collection: EntityId, group: GroupId) {
        self.collection_admins.insert(collection, group);
    }

    fn member_ids(&self, group: &GroupId) -> Vec<ActorId> {
        let mut seen_groups = HashSet::new();
        let mut seen_actors = HashSet::new();
        let mut ordered = Vec::new();
        let mut stack = vec![*group];

        while let Some(current) = stack.pop() {
            if !seen_groups.insert(current) {
                continue;
            }
            let Some(group) = self.groups.get(&current) else {
                continue;
            };
            for member in &group.members {
                if seen_actors.insert(*member) {
                    ordered.push(*member);
                }
            }
            // reverse so nested groups are visited in declaration order
            stack.extend(group.subgroups.iter().rev());
        }
        ordered
    }
}

impl ReviewerDirectory for MemoryDirectory {
    fn actor(&self, id: &ActorId) -> Option<Actor> {
        self.actors.get(id).map(|a| a.value().clone())
    }

    fn step_group(&self, collection: &EntityId, step: u8) -> Option<GroupId> {
        self.step_groups.get(&(*collection, step)).map(|g| *g)
    }

    fn members(&self, group: &GroupId) -> Vec<Actor> {
        self.member_ids(group)
            .iter()
            .filter_map(|id| self.actor(id))
            .collect()
    }

    fn collection_admins(&self, collection: &EntityId) -> Vec<Actor> {
        match self.collection_admins.get(collection).map(|g| *g) {
            Some(group) => self.members(&group),
            None => Vec::new(),
        }
    }

    fn site_admins(&self) -> Vec<Actor> {
        let mut admins: Vec<Actor> = self.admins.iter().filter_map(|id| self.actor(id.key())).collect();
        admins.sort_by(|a, b| a.email.cmp(&b.email));
        admins
    }

    fn clear_step_groups(&self, collection: &EntityId) {
        self.step_groups.retain(|(c, _), _| c != collection);
    }
}

impl AuthorizationOracle for MemoryDirectory {
    fn check_readable(&self, actor: Option<&ActorId>, entity: &Entity) -> Result<(), AccessDenied> {
        if !entity.restricted {
            return Ok(());
        }
        match actor {
            Some(id) if self.is_admin(id) => Ok(()),
            Some(id) => Err(AccessDenied::new(id.to_string(), "read", entity.id.to_string())),
            None => Err(AccessDenied::new("anonymous", "read", entity.id.to_string())),
        }
    }

    fn is_admin(&self, actor: &ActorId) -> bool {
        self.admins.contains(actor)
    }

    fn can_review(&self, actor: &ActorId, collection: &EntityId, step: u8) -> bool {
        if self.is_admin(actor) {
            return true;
        }
        match self.step_group(collection, step) {
            Some(group) => self.member_ids(&group).contains(actor),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ObjectType;

    #[test]
    fn members_include_nested_groups_once() {
        let dir = MemoryDirectory::new();
        let a = dir.add_actor(Actor::new("A", "a@example.org"));
        let b = dir.add_actor(Actor::new("B", "b@example.org"));
        let inner = dir.add_group(Group::new("inner").with_member(b).with_member(a));
        let outer = dir.add_group(Group::new("outer").with_member(a).with_subgroup(inner));

        let emails: Vec<String> = dir.members(&outer).into_iter().map(|m| m.email).collect();
        assert_eq!(emails, vec!["a@example.org", "b@example.org"]);
    }

    #[test]
    fn cyclic_groups_terminate() {
        let dir = MemoryDirectory::new();
        let a = dir.add_actor(Actor::new("A", "a@example.org"));
        let mut first = Group::new("first").with_member(a);
        let second = Group::new("second").with_subgroup(first.id);
        first.subgroups.push(second.id);
        let first_id = dir.add_group(first);
        dir.add_group(second);

        assert_eq!(dir.members(&first_id).len(), 1);
    }

    #[test]
    fn restricted_objects_are_hidden_from_anonymous() {
        let dir = MemoryDirectory::new();
        let open = Entity::new(ObjectType::Item, "open");
        let closed = Entity::new(ObjectType::Item, "closed").restricted();

        assert!(dir.check_readable(None, &open).is_ok());
        assert!(dir.check_readable(None, &closed).is_err());

        let admin = dir.add_actor(Actor::new("Root", "root@example.org"));
        dir.add_admin(admin);
        assert!(dir.check_readable(Some(&admin), &closed).is_ok());
    }

    #[test]
    fn review_rights_follow_step_group() {
        let dir = MemoryDirectory::new();
        let collection = EntityId::new();
        let reviewer = dir.add_actor(Actor::new("R", "r@example.org"));
        let outsider = dir.add_actor(Actor::new("O", "o@example.org"));
        let group = dir.add_group(Group::new("step2").with_member(reviewer));
        dir.assign_step_group(collection, 2, group);

        assert!(dir.can_review(&reviewer, &collection, 2));
        assert!(!dir.can_review(&reviewer, &collection, 1));
        assert!(!dir.can_review(&outsider, &collection, 2));
    }

    #[test]
    fn clearing_step_groups_only_touches_one_collection() {
        let dir = MemoryDirectory::new();
        let (c1, c2) = (EntityId::new(), EntityId::new());
        let group = dir.add_group(Group::new("g"));
        dir.assign_step_group(c1, 1, group);
        dir.assign_step_group(c1, 3, group);
        dir.assign_step_group(c2, 1, group);

        dir.clear_step_groups(&c1);

        assert!(dir.step_group(&c1, 1).is_none());
        assert!(dir.step_group(&c1, 3).is_none());
        assert_eq!(dir.step_group(&c2, 1), Some(group));
    }
}
