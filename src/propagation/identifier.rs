//! URI generation for subjects
//!
//! A generator turns a subject into the identifier of its named graph.
//! `None` means the subject cannot be addressed, e.g. a Site with no
//! handle under a handle-based scheme.

use crate::content::{EntityId, SubjectIdentifier, SubjectKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub trait IdentifierGenerator: Send + Sync {
    fn generate(
        &self,
        kind: SubjectKind,
        id: &EntityId,
        handle: Option<&str>,
        external_identifiers: &[String],
    ) -> Option<String>;

    fn generate_for(&self, subject: &SubjectIdentifier) -> Option<String> {
        self.generate(
            subject.kind,
            &subject.id,
            subject.handle.as_deref(),
            &subject.external_identifiers,
        )
    }
}

fn join(prefix: &str, rest: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), rest)
}

/// `{prefix}/{kind}/{uuid}`; never fails
#[derive(Debug, Clone)]
pub struct LocalUriGenerator {
    prefix: String,
}

impl LocalUriGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl IdentifierGenerator for LocalUriGenerator {
    fn generate(&self, kind: SubjectKind, id: &EntityId, _: Option<&str>, _: &[String]) -> Option<String> {
        Some(join(&self.prefix, &format!("{}/{}", kind, id)))
    }
}

/// `{prefix}/hdl/{handle}`; subjects without a handle have no URI
#[derive(Debug, Clone)]
pub struct HandleUriGenerator {
    prefix: String,
}

impl HandleUriGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl IdentifierGenerator for HandleUriGenerator {
    fn generate(&self, _: SubjectKind, _: &EntityId, handle: Option<&str>, _: &[String]) -> Option<String> {
        let handle = handle.map(str::trim).filter(|h| !h.is_empty())?;
        Some(join(&self.prefix, &format!("hdl/{}", handle)))
    }
}

/// Items with a `doi:` identifier get `{prefix}/doi/{doi}`; everything
/// else falls back to the handle form
#[derive(Debug, Clone)]
pub struct DoiHandleUriGenerator {
    prefix: String,
    fallback: HandleUriGenerator,
}

impl DoiHandleUriGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            fallback: HandleUriGenerator::new(prefix.clone()),
            prefix,
        }
    }
}

impl IdentifierGenerator for DoiHandleUriGenerator {
    fn generate(
        &self,
        kind: SubjectKind,
        id: &EntityId,
        handle: Option<&str>,
        external_identifiers: &[String],
    ) -> Option<String> {
        if kind == SubjectKind::Item {
            let doi = external_identifiers
                .iter()
                .find_map(|i| i.strip_prefix("doi:"))
                .filter(|d| !d.is_empty());
            if let Some(doi) = doi {
                return Some(join(&self.prefix, &format!("doi/{}", doi)));
            }
        }
        self.fallback.generate(kind, id, handle, external_identifiers)
    }
}

/// Configurable choice of generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStrategy {
    #[default]
    Local,
    Handle,
    DoiHandle,
}

impl IdentifierStrategy {
    pub fn build(self, prefix: &str) -> Arc<dyn IdentifierGenerator> {
        match self {
            Self::Local => Arc::new(LocalUriGenerator::new(prefix)),
            Self::Handle => Arc::new(HandleUriGenerator::new(prefix)),
            Self::DoiHandle => Arc::new(DoiHandleUriGenerator::new(prefix)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "http://repo.example.org/rdf/";

    #[test]
    fn local_uri_uses_kind_and_id() {
        let id = EntityId::new();
        let uri = LocalUriGenerator::new(PREFIX).generate(SubjectKind::Item, &id, None, &[]);
        assert_eq!(uri, Some(format!("http://repo.example.org/rdf/item/{}", id)));
    }

    #[test]
    fn handle_uri_requires_handle() {
        let generator = HandleUriGenerator::new(PREFIX);
        let id = EntityId::new();
        assert_eq!(
            generator.generate(SubjectKind::Collection, &id, Some("123/4"), &[]),
            Some("http://repo.example.org/rdf/hdl/123/4".to_string())
        );
        assert_eq!(generator.generate(SubjectKind::Site, &id, None, &[]), None);
        assert_eq!(generator.generate(SubjectKind::Site, &id, Some(" "), &[]), None);
    }

    #[test]
    fn doi_preferred_for_items_only() {
        let generator = DoiHandleUriGenerator::new(PREFIX);
        let id = EntityId::new();
        let ids = vec!["doi:10.1234/abc".to_string()];
        assert_eq!(
            generator.generate(SubjectKind::Item, &id, Some("123/4"), &ids),
            Some("http://repo.example.org/rdf/doi/10.1234/abc".to_string())
        );
        assert_eq!(
            generator.generate(SubjectKind::Collection, &id, Some("123/5"), &ids),
            Some("http://repo.example.org/rdf/hdl/123/5".to_string())
        );
        assert_eq!(
            generator.generate(SubjectKind::Item, &id, Some("123/6"), &[]),
            Some("http://repo.example.org/rdf/hdl/123/6".to_string())
        );
    }

    #[test]
    fn strategy_parses_from_yaml() {
        let strategy: IdentifierStrategy = serde_yaml::from_str("doi_handle").unwrap();
        assert_eq!(strategy, IdentifierStrategy::DoiHandle);
    }
}
