//! Subject conversion into named graphs
//!
//! A subject converts only when it exists, is readable anonymously and,
//! for items, is archived, not withdrawn and discoverable. Every other
//! outcome is a `ConversionError` the caller routes to deletion or skips.

use super::identifier::IdentifierGenerator;
use crate::content::{
    ContentStore, Entity, EntityId, ObjectType, SubjectIdentifier, SubjectKind, PROVENANCE_FIELD,
};
use crate::identity::AuthorizationOracle;
use crate::storage::{NamedGraph, Term};
use std::sync::Arc;
use thiserror::Error;

pub const DSPACE_NS: &str = "http://digital-repositories.org/ontologies/dspace/0.1.0#";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const OWL_SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";

const HANDLE_RESOLVER: &str = "http://hdl.handle.net/";
const DOI_RESOLVER: &str = "https://doi.org/";

/// Why an item cannot be published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpublishable {
    NotArchived,
    Withdrawn,
    NotDiscoverable,
}

impl std::fmt::Display for Unpublishable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotArchived => write!(f, "not archived"),
            Self::Withdrawn => write!(f, "withdrawn"),
            Self::NotDiscoverable => write!(f, "not discoverable"),
        }
    }
}

/// Per-subject conversion failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("{0} no longer exists")]
    NotFound(SubjectIdentifier),

    #[error("{0} is not readable anonymously")]
    NotAuthorized(SubjectIdentifier),

    #[error("{subject} is {reason}")]
    NotPublishable {
        subject: SubjectIdentifier,
        reason: Unpublishable,
    },

    #[error("no identifier can be generated for {0}")]
    MissingIdentifier(SubjectIdentifier),
}

impl ConversionError {
    /// Whether the stale representation should be removed from the store
    pub fn routes_to_deletion(&self) -> bool {
        !matches!(self, Self::MissingIdentifier(_))
    }

    pub fn subject(&self) -> &SubjectIdentifier {
        match self {
            Self::NotFound(s)
            | Self::NotAuthorized(s)
            | Self::MissingIdentifier(s)
            | Self::NotPublishable { subject: s, .. } => s,
        }
    }
}

fn live_subject(kind: SubjectKind, entity: &Entity) -> SubjectIdentifier {
    SubjectIdentifier::new(kind, entity.id)
        .with_handle(entity.handle.clone())
        .with_external_identifiers(entity.external_identifiers.clone())
}

fn type_name(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Site => "Repository",
        SubjectKind::Community => "Community",
        SubjectKind::Collection => "Collection",
        SubjectKind::Item => "Item",
    }
}

fn dspace(term: &str) -> String {
    format!("{}{}", DSPACE_NS, term)
}

/// Predicate linking a parent subject to a child subject
fn has_part(parent: SubjectKind, child: SubjectKind) -> Option<&'static str> {
    match (parent, child) {
        (SubjectKind::Site, SubjectKind::Community) => Some("hasCommunity"),
        (SubjectKind::Community, SubjectKind::Community) => Some("hasSubcommunity"),
        (SubjectKind::Community, SubjectKind::Collection) => Some("hasCollection"),
        (SubjectKind::Collection, SubjectKind::Item) => Some("hasItem"),
        _ => None,
    }
}

fn is_part_of(parent: SubjectKind) -> Option<&'static str> {
    match parent {
        SubjectKind::Site => Some("isPartOfRepository"),
        SubjectKind::Community => Some("isPartOfCommunity"),
        SubjectKind::Collection => Some("isPartOfCollection"),
        SubjectKind::Item => None,
    }
}

/// Maps a metadata field onto a predicate. Qualified Dublin Core fields use
/// their qualifier (`dc.date.issued` -> `dcterms:issued`); other schemas are
/// kept under the repository namespace.
fn metadata_predicate(field: &str) -> Option<String> {
    let mut parts = field.split('.');
    let schema = parts.next()?;
    let element = parts.next()?;
    let qualifier = parts.next();
    match schema {
        "dc" | "dcterms" => Some(format!("{}{}", DCTERMS_NS, qualifier.unwrap_or(element))),
        _ => Some(dspace(&format!("metadata/{}", field))),
    }
}

/// Turns subjects into named graphs
pub struct Converter {
    content: Arc<dyn ContentStore>,
    auth: Arc<dyn AuthorizationOracle>,
    identifiers: Arc<dyn IdentifierGenerator>,
}

impl Converter {
    pub fn new(
        content: Arc<dyn ContentStore>,
        auth: Arc<dyn AuthorizationOracle>,
        identifiers: Arc<dyn IdentifierGenerator>,
    ) -> Self {
        Self {
            content,
            auth,
            identifiers,
        }
    }

    pub fn identifiers(&self) -> &dyn IdentifierGenerator {
        self.identifiers.as_ref()
    }

    /// Anonymous readability plus, for items, publication status
    pub fn check_public(&self, entity: &Entity, subject: &SubjectIdentifier) -> Result<(), ConversionError> {
        if self.auth.check_readable(None, entity).is_err() {
            return Err(ConversionError::NotAuthorized(subject.clone()));
        }
        if entity.is_item() {
            let reason = if entity.status.withdrawn {
                Some(Unpublishable::Withdrawn)
            } else if !entity.status.archived {
                Some(Unpublishable::NotArchived)
            } else if !entity.status.discoverable {
                Some(Unpublishable::NotDiscoverable)
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConversionError::NotPublishable {
                    subject: subject.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Resolve and convert a subject
    pub fn convert(&self, subject: &SubjectIdentifier) -> Result<NamedGraph, ConversionError> {
        let entity = self
            .content
            .find(subject.kind.into(), &subject.id)
            .ok_or_else(|| ConversionError::NotFound(subject.clone()))?;
        self.check_public(&entity, subject)?;
        self.convert_entity(subject.kind, &entity)
    }

    /// Convert an already-resolved, already-checked entity
    pub fn convert_entity(&self, kind: SubjectKind, entity: &Entity) -> Result<NamedGraph, ConversionError> {
        let subject = live_subject(kind, entity);
        let uri = self
            .identifiers
            .generate_for(&subject)
            .ok_or_else(|| ConversionError::MissingIdentifier(subject.clone()))?;

        let mut graph = NamedGraph::new(uri.clone());
        graph.describe(RDF_TYPE, Term::uri(dspace(type_name(kind))));

        let mut has_title = false;
        for value in &entity.metadata {
            if value.field == PROVENANCE_FIELD {
                continue;
            }
            if let Some(predicate) = metadata_predicate(&value.field) {
                has_title |= value.field == "dc.title";
                graph.describe(&predicate, Term::literal(value.value.clone()));
            }
        }
        if !has_title {
            if let Some(name) = entity.name.as_deref().filter(|n| !n.trim().is_empty()) {
                graph.describe(&format!("{}title", DCTERMS_NS), Term::literal(name));
            }
        }

        if let Some(handle) = &entity.handle {
            graph.describe(OWL_SAME_AS, Term::uri(format!("{}{}", HANDLE_RESOLVER, handle)));
        }
        for identifier in &entity.external_identifiers {
            if let Some(doi) = identifier.strip_prefix("doi:") {
                graph.describe(OWL_SAME_AS, Term::uri(format!("{}{}", DOI_RESOLVER, doi)));
            } else if identifier.contains("://") {
                graph.describe(OWL_SAME_AS, Term::uri(identifier.clone()));
            } else {
                graph.describe(&format!("{}identifier", DCTERMS_NS), Term::literal(identifier.clone()));
            }
        }

        for parent_id in &entity.parents {
            let Some(parent) = self.public_neighbour(parent_id) else {
                continue;
            };
            if let Some(predicate) = is_part_of(parent.0) {
                graph.describe(&dspace(predicate), Term::uri(parent.1));
            }
        }

        for child in self.content.list_children(&entity.id) {
            match child.object_type {
                ObjectType::Bundle if kind == SubjectKind::Item => {
                    self.describe_bitstreams(&mut graph, &uri, &child);
                }
                _ => {
                    let Some((child_kind, child_uri)) = self.public_link(&child) else {
                        continue;
                    };
                    if let Some(predicate) = has_part(kind, child_kind) {
                        graph.describe(&dspace(predicate), Term::uri(child_uri));
                    }
                }
            }
        }

        Ok(graph)
    }

    fn describe_bitstreams(&self, graph: &mut NamedGraph, item_uri: &str, bundle: &Entity) {
        for bitstream in self.content.list_children(&bundle.id) {
            if bitstream.object_type != ObjectType::Bitstream
                || self.auth.check_readable(None, &bitstream).is_err()
            {
                continue;
            }
            graph.describe(
                &dspace("hasBitstream"),
                Term::uri(format!("{}/bitstream/{}", item_uri.trim_end_matches('/'), bitstream.id)),
            );
        }
    }

    fn public_neighbour(&self, id: &EntityId) -> Option<(SubjectKind, String)> {
        [ObjectType::Site, ObjectType::Community, ObjectType::Collection]
            .into_iter()
            .find_map(|t| self.content.find(t, id))
            .and_then(|entity| self.public_link(&entity))
    }

    /// Kind and URI of a related subject, if it would itself be published
    fn public_link(&self, entity: &Entity) -> Option<(SubjectKind, String)> {
        let kind = SubjectKind::try_from(entity.object_type).ok()?;
        let subject = live_subject(kind, entity);
        self.check_public(entity, &subject).ok()?;
        let uri = self.identifiers.generate_for(&subject)?;
        Some((kind, uri))
    }
}
