//! Batch rebuild of the external store
//!
//! Walks the containment tree depth first from a starting subject. Children
//! are handled before their parent, and each subject is handled at most
//! once per run. Conversion prunes subtrees that are not public; deletion
//! does not.

use super::consumer::PropagationError;
use super::convert::Converter;
use crate::content::{ContentStore, Entity, EntityId, ObjectType, SubjectIdentifier, SubjectKind};
use crate::storage::{GraphStore, NamedGraph};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of identifiers that name a handle rather than a URI
pub const HANDLE_PREFIX: &str = "hdl:";

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildOptions {
    /// Convert and report, but never touch the store
    pub dry_run: bool,
    /// Keep every converted graph in the report
    pub capture: bool,
}

#[derive(Debug, Default)]
pub struct RebuildReport {
    pub converted: Vec<SubjectIdentifier>,
    /// Identifiers removed (or that would be, on a dry run)
    pub deleted: Vec<String>,
    pub skipped: Vec<(SubjectIdentifier, String)>,
    pub deleted_all: bool,
    pub graphs: Vec<NamedGraph>,
}

pub struct Rebuilder {
    content: Arc<dyn ContentStore>,
    converter: Arc<Converter>,
    store: Arc<dyn GraphStore>,
    options: RebuildOptions,
}

impl Rebuilder {
    pub fn new(
        content: Arc<dyn ContentStore>,
        converter: Arc<Converter>,
        store: Arc<dyn GraphStore>,
    ) -> Self {
        Self {
            content,
            converter,
            store,
            options: RebuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RebuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Look up an entity by `hdl:` identifier; other strings are not resolvable
    pub fn resolve(&self, identifier: &str) -> Option<Entity> {
        let handle = identifier.strip_prefix(HANDLE_PREFIX)?;
        self.content.find_by_handle(handle.trim())
    }

    /// Convert the whole repository starting at the site
    pub async fn convert_all(&self) -> Result<RebuildReport, PropagationError> {
        match self.content.site() {
            Some(site) => self.convert(&site).await,
            None => {
                warn!("no site configured; nothing to convert");
                Ok(RebuildReport::default())
            }
        }
    }

    /// Convert a subject and every public descendant
    pub async fn convert(&self, root: &Entity) -> Result<RebuildReport, PropagationError> {
        let mut report = RebuildReport::default();
        let plan = self.plan(root, true, &mut report)?;

        for (subject, entity) in plan {
            match self.converter.convert_entity(subject.kind, &entity) {
                Ok(graph) => {
                    if !self.options.dry_run {
                        self.store.store(&graph).await?;
                    }
                    debug!(%subject, identifier = %graph.identifier, dry_run = self.options.dry_run, "converted");
                    if self.options.capture {
                        report.graphs.push(graph);
                    }
                    report.converted.push(subject);
                }
                Err(e) => {
                    warn!(%subject, reason = %e, "skipping subject");
                    report.skipped.push((subject, e.to_string()));
                }
            }
        }

        info!(
            converted = report.converted.len(),
            skipped = report.skipped.len(),
            "conversion run complete"
        );
        Ok(report)
    }

    /// Delete a subject and all its descendants. Deleting the site empties
    /// the store first.
    pub async fn delete(&self, root: &Entity) -> Result<RebuildReport, PropagationError> {
        let mut report = RebuildReport::default();
        if root.object_type == ObjectType::Site {
            self.delete_everything(&mut report).await?;
        }

        let plan = self.plan(root, false, &mut report)?;
        for (subject, _) in plan {
            match self.converter.identifiers().generate_for(&subject) {
                Some(identifier) => {
                    if !self.options.dry_run {
                        self.store.delete(&identifier).await?;
                    }
                    report.deleted.push(identifier);
                }
                None => {
                    warn!(%subject, "cannot delete subject without an identifier");
                    report
                        .skipped
                        .push((subject, "no identifier can be generated".to_string()));
                }
            }
        }
        info!(deleted = report.deleted.len(), "deletion run complete");
        Ok(report)
    }

    /// Remove everything from the store
    pub async fn delete_all(&self) -> Result<RebuildReport, PropagationError> {
        let mut report = RebuildReport::default();
        self.delete_everything(&mut report).await?;
        Ok(report)
    }

    /// Remove one graph by its URI, whether or not the subject still exists
    pub async fn delete_identifier(&self, identifier: &str) -> Result<RebuildReport, PropagationError> {
        let mut report = RebuildReport::default();
        if !self.options.dry_run {
            self.store.delete(identifier).await?;
        }
        report.deleted.push(identifier.to_string());
        Ok(report)
    }

    async fn delete_everything(&self, report: &mut RebuildReport) -> Result<(), PropagationError> {
        if !self.options.dry_run {
            self.store.delete_all().await?;
        }
        info!(dry_run = self.options.dry_run, "cleared graph store");
        report.deleted_all = true;
        Ok(())
    }

    /// Post-order list of subjects under `root`.
    ///
    /// With `check`, a subject that is not public is reported as skipped
    /// and its subtree is not visited.
    fn plan(
        &self,
        root: &Entity,
        check: bool,
        report: &mut RebuildReport,
    ) -> Result<Vec<(SubjectIdentifier, Entity)>, PropagationError> {
        let mut processed = HashSet::new();
        let mut plan = Vec::new();
        self.visit(root.clone(), check, &mut processed, &mut plan, report)?;
        Ok(plan)
    }

    fn visit(
        &self,
        entity: Entity,
        check: bool,
        processed: &mut HashSet<EntityId>,
        plan: &mut Vec<(SubjectIdentifier, Entity)>,
        report: &mut RebuildReport,
    ) -> Result<(), PropagationError> {
        let subject = SubjectIdentifier::from_entity(&entity)?;
        if !processed.insert(entity.id) {
            return Ok(());
        }
        if check {
            if let Err(e) = self.converter.check_public(&entity, &subject) {
                debug!(%subject, reason = %e, "not public; skipping subtree");
                report.skipped.push((subject, e.to_string()));
                return Ok(());
            }
        }

        if subject.kind != SubjectKind::Item {
            for child in self.content.list_children(&entity.id) {
                if matches!(
                    child.object_type,
                    ObjectType::Community | ObjectType::Collection | ObjectType::Item
                ) {
                    self.visit(child, check, processed, plan, report)?;
                }
            }
        }

        plan.push((subject, entity));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentSnapshot, MemoryContentStore, SubjectError};
    use crate::identity::MemoryDirectory;
    use crate::propagation::HandleUriGenerator;
    use crate::storage::{MemoryGraphStore, StoreOp};

    struct Tree {
        content: Arc<MemoryContentStore>,
        site: Entity,
        collection: Entity,
    }

    fn tree() -> Tree {
        let site = Entity::new(ObjectType::Site, "Repo").with_handle("1/0");
        let community = Entity::new(ObjectType::Community, "C").with_handle("1/1").with_parent(site.id);
        let collection = Entity::new(ObjectType::Collection, "K")
            .with_handle("1/2")
            .with_parent(community.id);
        let public = Entity::new(ObjectType::Item, "public")
            .with_handle("1/3")
            .with_parent(collection.id)
            .archived();
        let pending = Entity::new(ObjectType::Item, "pending")
            .with_handle("1/4")
            .with_parent(collection.id);
        let content = Arc::new(MemoryContentStore::from_snapshot(ContentSnapshot {
            entities: vec![
                site.clone(),
                community,
                collection.clone(),
                public,
                pending,
            ],
            in_progress: Vec::new(),
        }));
        Tree {
            content,
            site,
            collection,
        }
    }

    fn rebuilder(content: Arc<MemoryContentStore>, options: RebuildOptions) -> (Rebuilder, Arc<MemoryGraphStore>) {
        let store = Arc::new(MemoryGraphStore::new());
        let converter = Arc::new(Converter::new(
            content.clone(),
            Arc::new(MemoryDirectory::new()),
            Arc::new(HandleUriGenerator::new("http://x")),
        ));
        (
            Rebuilder::new(content, converter, store.clone()).with_options(options),
            store,
        )
    }

    #[tokio::test]
    async fn convert_all_visits_children_before_parents() {
        let tree = tree();
        let (rebuilder, store) = rebuilder(tree.content.clone(), RebuildOptions::default());

        let report = rebuilder.convert_all().await.unwrap();

        let handles: Vec<_> = report
            .converted
            .iter()
            .map(|s| s.handle.clone().unwrap_or_default())
            .collect();
        assert_eq!(handles, vec!["1/3", "1/2", "1/1", "1/0"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(store.len(), 4);
        assert!(!store.contains("http://x/hdl/1/4"));
    }

    #[tokio::test]
    async fn dry_run_leaves_store_untouched() {
        let tree = tree();
        let options = RebuildOptions {
            dry_run: true,
            capture: true,
        };
        let (rebuilder, store) = rebuilder(tree.content.clone(), options);

        let report = rebuilder.convert_all().await.unwrap();

        assert_eq!(report.converted.len(), 4);
        assert_eq!(report.graphs.len(), 4);
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn deleting_site_clears_store_first() {
        let tree = tree();
        let (rebuilder, store) = rebuilder(tree.content.clone(), RebuildOptions::default());

        let report = rebuilder.delete(&tree.site).await.unwrap();

        assert!(report.deleted_all);
        assert_eq!(store.operations()[0], StoreOp::DeleteAll);
        // deletion does not prune non-public subtrees
        assert_eq!(report.deleted.len(), 5);
    }

    #[tokio::test]
    async fn deleting_collection_removes_its_items() {
        let tree = tree();
        let (rebuilder, store) = rebuilder(tree.content.clone(), RebuildOptions::default());

        let report = rebuilder.delete(&tree.collection).await.unwrap();

        assert!(!report.deleted_all);
        assert_eq!(
            report.deleted,
            vec!["http://x/hdl/1/3", "http://x/hdl/1/4", "http://x/hdl/1/2"]
        );
        assert!(!store.operations().contains(&StoreOp::DeleteAll));
    }

    #[tokio::test]
    async fn resolves_handles_only() {
        let tree = tree();
        let (rebuilder, _) = rebuilder(tree.content.clone(), RebuildOptions::default());
        assert_eq!(rebuilder.resolve("hdl:1/2").map(|e| e.id), Some(tree.collection.id));
        assert!(rebuilder.resolve("1/2").is_none());
        assert!(rebuilder.resolve("hdl:9/9").is_none());
    }

    #[tokio::test]
    async fn bitstream_root_is_illegal() {
        let tree = tree();
        let (rebuilder, _) = rebuilder(tree.content.clone(), RebuildOptions::default());
        let bitstream = Entity::new(ObjectType::Bitstream, "file");

        let err = rebuilder.convert(&bitstream).await.unwrap_err();
        assert!(matches!(
            err,
            PropagationError::IllegalSubject(SubjectError::IllegalSubjectKind(ObjectType::Bitstream))
        ));
    }
}
