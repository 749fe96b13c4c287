//! SQLite storage backend for converted subjects

use super::named_graph::{NamedGraph, Statement};
use super::traits::{GraphStore, OpenStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite-backed graph store
///
/// One row per named graph; statements are kept as a JSON payload.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS named_graphs (
                identifier TEXT PRIMARY KEY,
                statements_json TEXT NOT NULL,
                statement_count INTEGER NOT NULL,
                stored_at TEXT NOT NULL
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// When a graph was last written
    pub fn stored_at(&self, identifier: &str) -> StorageResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT stored_at FROM named_graphs WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StorageError::DateParse(e.to_string()))
        })
        .transpose()
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    async fn store(&self, graph: &NamedGraph) -> StorageResult<()> {
        let statements_json = serde_json::to_string(&graph.statements)?;
        self.conn().execute(
            r#"
            INSERT INTO named_graphs (identifier, statements_json, statement_count, stored_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(identifier) DO UPDATE SET
                statements_json = excluded.statements_json,
                statement_count = excluded.statement_count,
                stored_at = excluded.stored_at
            "#,
            params![
                graph.identifier,
                statements_json,
                graph.statements.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> StorageResult<bool> {
        let rows = self.conn().execute(
            "DELETE FROM named_graphs WHERE identifier = ?1",
            params![identifier],
        )?;
        Ok(rows > 0)
    }

    async fn delete_all(&self) -> StorageResult<()> {
        self.conn().execute("DELETE FROM named_graphs", [])?;
        Ok(())
    }

    async fn load(&self, identifier: &str) -> StorageResult<Option<NamedGraph>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT statements_json FROM named_graphs WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let statements: Vec<Statement> = serde_json::from_str(&json)?;
                Ok(Some(NamedGraph {
                    identifier: identifier.to_string(),
                    statements,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_identifiers(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT identifier FROM named_graphs ORDER BY identifier")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Term;

    fn graph(identifier: &str, title: &str) -> NamedGraph {
        let mut graph = NamedGraph::new(identifier);
        graph.describe("http://purl.org/dc/terms/title", Term::literal(title));
        graph
    }

    #[tokio::test]
    async fn store_then_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&graph("http://x/item/1", "First")).await.unwrap();

        let loaded = store.load("http://x/item/1").await.unwrap().unwrap();
        assert_eq!(loaded, graph("http://x/item/1", "First"));
        assert!(store.stored_at("http://x/item/1").unwrap().is_some());
    }

    #[tokio::test]
    async fn store_replaces_existing_graph() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&graph("http://x/item/1", "First")).await.unwrap();
        store.store(&graph("http://x/item/1", "Second")).await.unwrap();

        let loaded = store.load("http://x/item/1").await.unwrap().unwrap();
        assert_eq!(loaded.statements[0].object, Term::literal("Second"));
        assert_eq!(store.list_identifiers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&graph("http://x/item/1", "First")).await.unwrap();

        assert!(store.delete("http://x/item/1").await.unwrap());
        assert!(!store.delete("http://x/item/1").await.unwrap());
        assert!(store.load("http://x/item/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_all_empties_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store(&graph("http://x/b", "B")).await.unwrap();
        store.store(&graph("http://x/a", "A")).await.unwrap();
        assert_eq!(
            store.list_identifiers().await.unwrap(),
            vec!["http://x/a".to_string(), "http://x/b".to_string()]
        );

        store.delete_all().await.unwrap();
        assert!(store.list_identifiers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graphs.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.store(&graph("http://x/item/1", "Kept")).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.load("http://x/item/1").await.unwrap().is_some());
    }
}
