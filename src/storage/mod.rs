//! Storage backends for converted subjects
//!
//! Converted subjects are written to an external store through the
//! `GraphStore` trait. `SqliteStore` is the persistent implementation;
//! `MemoryGraphStore` keeps everything in process.

mod memory;
mod named_graph;
mod sqlite;
mod traits;

pub use memory::{MemoryGraphStore, StoreOp};
pub use named_graph::{NamedGraph, Statement, Term};
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, OpenStore, StorageError, StorageResult};
