//! In-memory graph store with an operation log

use super::named_graph::NamedGraph;
use super::traits::{GraphStore, StorageError, StorageResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// One call made against the store, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Store(String),
    Delete(String),
    DeleteAll,
}

/// DashMap-backed store that remembers every operation applied to it.
///
/// Can be switched offline to exercise systemic failure paths.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    graphs: DashMap<String, NamedGraph>,
    operations: Mutex<Vec<StoreOp>>,
    offline: AtomicBool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.graphs.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<NamedGraph> {
        self.graphs.get(identifier).map(|g| g.value().clone())
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    fn apply(&self, op: StoreOp) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("store is offline".to_string()));
        }
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn store(&self, graph: &NamedGraph) -> StorageResult<()> {
        self.apply(StoreOp::Store(graph.identifier.clone()))?;
        self.graphs.insert(graph.identifier.clone(), graph.clone());
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> StorageResult<bool> {
        self.apply(StoreOp::Delete(identifier.to_string()))?;
        Ok(self.graphs.remove(identifier).is_some())
    }

    async fn delete_all(&self) -> StorageResult<()> {
        self.apply(StoreOp::DeleteAll)?;
        self.graphs.clear();
        Ok(())
    }

    async fn load(&self, identifier: &str) -> StorageResult<Option<NamedGraph>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("store is offline".to_string()));
        }
        Ok(self.get(identifier))
    }

    async fn list_identifiers(&self) -> StorageResult<Vec<String>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("store is offline".to_string()));
        }
        let mut ids: Vec<String> = self.graphs.iter().map(|g| g.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
