#![forbid(unsafe_code)]

//! SQLite-backed graph storage.
//!
//! All writes for one file's analysis happen inside one transaction: clear,
//! nodes, edges, pending flush, commit. Node writes are idempotent upserts
//! keyed by semantic id, so re-analyzing unchanged source rewrites the same
//! rows instead of accumulating duplicates.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{IdentityError, StoreError};
use crate::types::{Edge, EdgeKind, FileRecord, Language, Node, NodeKind};

const SCHEMA: &str = include_str!("store/schema.sql");

pub const DATA_DIR: &str = ".cartograph";
pub const DB_FILE: &str = "graph.db";

pub fn db_path(project_root: &Path) -> PathBuf {
    project_root.join(DATA_DIR).join(DB_FILE)
}

/// Write interface the assembler batches against. Reads go through the
/// concrete store; the pipeline only ever writes through this trait.
pub trait GraphStore {
    fn begin(&mut self) -> Result<(), StoreError>;
    fn write_node(&mut self, node: &Node) -> Result<(), StoreError>;
    /// `origin_file` is the file whose analysis produced the edge; it is
    /// what ties the edge to a clear-then-rebuild cycle.
    fn write_edge(&mut self, edge: &Edge, origin_file: &str) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    fn rollback(&mut self) -> Result<(), StoreError>;
    /// Whether writes between `begin` and `commit` apply atomically. A store
    /// answering false still works, but the pipeline logs that durability is
    /// degraded to per-write.
    fn supports_batching(&self) -> bool {
        true
    }
}

pub struct SqliteStore {
    conn: Connection,
    in_tx: bool,
}

impl SqliteStore {
    pub fn open(project_root: &Path) -> Result<Self, StoreError> {
        let path = db_path(project_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, in_tx: false })
    }

    fn require_tx(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.in_tx {
            Ok(())
        } else {
            Err(StoreError::NoTransaction { operation })
        }
    }

    /// Remove a file's nodes plus every edge touching them. Runs inside the
    /// rebuild transaction so readers never see a half-cleared file.
    pub fn delete_file_graph(&mut self, file: &str) -> Result<usize, StoreError> {
        self.conn.execute(
            "DELETE FROM edges
             WHERE file = ?1
                OR src IN (SELECT id FROM nodes WHERE file = ?1)
                OR dst IN (SELECT id FROM nodes WHERE file = ?1)",
            params![file],
        )?;
        let removed = self
            .conn
            .execute("DELETE FROM nodes WHERE file = ?1", params![file])?;
        Ok(removed)
    }

    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("DELETE FROM edges; DELETE FROM nodes; DELETE FROM files;")?;
        Ok(())
    }

    pub fn node_by_id(&self, id: &str) -> Result<Option<Node>, StoreError> {
        let node = self
            .conn
            .query_row(
                "SELECT id, kind, name, file, line, col, metadata FROM nodes WHERE id = ?1",
                params![id],
                node_from_row,
            )
            .optional()?;
        Ok(node)
    }

    pub fn nodes_by_kind(&self, kind: NodeKind, limit: usize) -> Result<Vec<Node>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, file, line, col, metadata FROM nodes
             WHERE kind = ?1 ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![kind.tag(), limit as i64], node_from_row)?;
        collect_rows(rows)
    }

    pub fn nodes_by_name(&self, name: &str, limit: usize) -> Result<Vec<Node>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, file, line, col, metadata FROM nodes
             WHERE name = ?1 ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![name, limit as i64], node_from_row)?;
        collect_rows(rows)
    }

    pub fn nodes_in_file(&self, file: &str) -> Result<Vec<Node>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, file, line, col, metadata FROM nodes
             WHERE file = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![file], node_from_row)?;
        collect_rows(rows)
    }

    /// Everything inside a scope, by id prefix. The prefix must come from
    /// [`crate::identity::scope_prefix`] so it ends with the separator.
    pub fn nodes_in_scope(&self, prefix: &str, limit: usize) -> Result<Vec<Node>, StoreError> {
        let pattern = format!("{}%", like_escape(prefix));
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, file, line, col, metadata FROM nodes
             WHERE id LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit as i64], node_from_row)?;
        collect_rows(rows)
    }

    pub fn edges_from(&self, src: &str) -> Result<Vec<Edge>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT src, dst, kind, line, col, metadata FROM edges
             WHERE src = ?1 ORDER BY kind, dst",
        )?;
        let rows = stmt.query_map(params![src], edge_from_row)?;
        collect_rows(rows)
    }

    pub fn edges_to(&self, dst: &str) -> Result<Vec<Edge>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT src, dst, kind, line, col, metadata FROM edges
             WHERE dst = ?1 ORDER BY kind, src",
        )?;
        let rows = stmt.query_map(params![dst], edge_from_row)?;
        collect_rows(rows)
    }

    pub fn node_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?)
    }

    pub fn edge_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?)
    }

    pub fn counts_by_kind(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind ORDER BY kind")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        collect_rows(rows)
    }

    pub fn upsert_file_record(&mut self, record: &FileRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO files (path, content_hash, language, size, indexed_at, node_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(path) DO UPDATE SET
                 content_hash = excluded.content_hash,
                 language = excluded.language,
                 size = excluded.size,
                 indexed_at = excluded.indexed_at,
                 node_count = excluded.node_count",
            params![
                record.path,
                record.content_hash,
                record.language.tag(),
                record.size as i64,
                record.indexed_at,
                record.node_count,
            ],
        )?;
        Ok(())
    }

    pub fn file_record(&self, path: &str) -> Result<Option<FileRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT path, content_hash, language, size, indexed_at, node_count
                 FROM files WHERE path = ?1",
                params![path],
                file_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn all_file_records(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT path, content_hash, language, size, indexed_at, node_count
             FROM files ORDER BY path",
        )?;
        let rows = stmt.query_map([], file_from_row)?;
        collect_rows(rows)
    }

    pub fn delete_file_record(&mut self, path: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(())
    }
}

impl GraphStore for SqliteStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_tx {
            return Err(StoreError::TransactionOpen);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_tx = true;
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<(), StoreError> {
        self.require_tx("write_node")?;
        let metadata = node
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO nodes (id, kind, name, file, line, col, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 kind = excluded.kind,
                 name = excluded.name,
                 file = excluded.file,
                 line = excluded.line,
                 col = excluded.col,
                 metadata = excluded.metadata",
            params![
                node.id,
                node.kind.tag(),
                node.name,
                node.file,
                node.line,
                node.column,
                metadata,
            ],
        )?;
        Ok(())
    }

    fn write_edge(&mut self, edge: &Edge, origin_file: &str) -> Result<(), StoreError> {
        self.require_tx("write_edge")?;
        let metadata = edge
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT OR IGNORE INTO edges (src, dst, kind, file, line, col, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                edge.src,
                edge.dst,
                edge.kind.tag(),
                origin_file,
                edge.line,
                edge.column,
                metadata,
            ],
        )?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.require_tx("commit")?;
        self.conn.execute_batch("COMMIT")?;
        self.in_tx = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.in_tx = false;
        Ok(())
    }
}

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let kind_tag: String = row.get(1)?;
    let kind = NodeKind::from_tag(&kind_tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::new(IdentityError::UnknownKind {
                id: row.get::<_, String>(0).unwrap_or_default(),
                tag: kind_tag.clone(),
            }),
        )
    })?;
    let metadata: Option<String> = row.get(6)?;
    Ok(Node {
        id: row.get(0)?,
        kind,
        name: row.get(2)?,
        file: row.get(3)?,
        line: row.get(4)?,
        column: row.get(5)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
    })
}

fn edge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    let kind_tag: String = row.get(2)?;
    let kind = EdgeKind::from_tag(&kind_tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(IdentityError::Malformed {
                id: kind_tag.clone(),
                reason: "unknown edge kind",
            }),
        )
    })?;
    let metadata: Option<String> = row.get(5)?;
    Ok(Edge {
        src: row.get(0)?,
        dst: row.get(1)?,
        kind,
        line: row.get(3)?,
        column: row.get(4)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
    })
}

fn file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    let language: String = row.get(2)?;
    Ok(FileRecord {
        path: row.get(0)?,
        content_hash: row.get(1)?,
        language: Language::from_tag(&language),
        size: row.get::<_, i64>(3)?.max(0) as u64,
        indexed_at: row.get(4)?,
        node_count: row.get(5)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Escape LIKE wildcards in a literal prefix.
fn like_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
