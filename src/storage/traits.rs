//! Storage trait definitions

use super::named_graph::NamedGraph;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Graph store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// External store of converted subjects, one named graph per identifier.
///
/// Every operation is idempotent: storing replaces, deleting a missing
/// identifier succeeds with `false`. A failure here is systemic and is
/// propagated to whoever drives the conversion.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert or replace the graph stored under `graph.identifier`
    async fn store(&self, graph: &NamedGraph) -> StorageResult<()>;

    /// Remove a graph; returns whether one existed
    async fn delete(&self, identifier: &str) -> StorageResult<bool>;

    /// Remove every graph
    async fn delete_all(&self) -> StorageResult<()>;

    async fn load(&self, identifier: &str) -> StorageResult<Option<NamedGraph>>;

    /// Stored identifiers in lexical order
    async fn list_identifiers(&self) -> StorageResult<Vec<String>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
