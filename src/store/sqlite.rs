//! SQLite-backed local persistent index.
//!
//! Every record lives in one row; embeddings are little-endian f32 BLOBs. Queries
//! scan the table and rank by exact cosine similarity, so results are exact rather
//! than approximate. A successful insert is visible to the next query.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::vectors::{blob_to_embedding, cosine_similarity, embedding_to_blob};
use super::{validate_embedding, validate_limit, BackendKind, StoreError, VectorStore};
use crate::memory_types::{MemoryId, Metadata, ScoredMemory, VectorRecord};

pub type Result<T> = std::result::Result<T, StoreError>;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const META_DIMENSION: &str = "dimension";
const META_MODEL: &str = "embedding_model";

/// Initialize database schema.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Record the index identity on first open; verify it on every later open.
fn ensure_identity(conn: &mut Connection, path: &Path, dimension: usize, model_id: &str) -> Result<()> {
    let tx = conn.transaction()?;

    let stored_dimension: Option<String> = tx
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1",
            [META_DIMENSION],
            |row| row.get(0),
        )
        .optional()?;
    match stored_dimension {
        Some(value) if value.parse::<usize>().ok() != Some(dimension) => {
            return Err(StoreError::IndexMismatch(format!(
                "{} holds {}-dimensional embeddings, configured for {}",
                path.display(),
                value,
                dimension
            )));
        }
        Some(_) => {}
        None => {
            tx.execute(
                "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                params![META_DIMENSION, dimension.to_string()],
            )?;
        }
    }

    let stored_model: Option<String> = tx
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1",
            [META_MODEL],
            |row| row.get(0),
        )
        .optional()?;
    match stored_model {
        Some(value) if value != model_id => {
            return Err(StoreError::IndexMismatch(format!(
                "{} was built with embedding model '{}', configured for '{}'",
                path.display(),
                value,
                model_id
            )));
        }
        Some(_) => {}
        None => {
            tx.execute(
                "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                params![META_MODEL, model_id],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Local persistent vector index in a single SQLite file.
///
/// rusqlite calls block, so every trait operation runs on tokio's blocking pool
/// against a shared `SqliteIndex`.
pub struct SqliteStore {
    index: Arc<SqliteIndex>,
}

/// Connection plus the identity it was opened with.
struct SqliteIndex {
    conn: Mutex<Connection>,
    path: PathBuf,
    dimension: usize,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.index.path)
            .field("dimension", &self.index.dimension)
            .finish()
    }
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The path contains `..` components
    /// - The parent directory is not accessible
    /// - The database cannot be opened
    /// - The store was created for another dimensionality or embedding model
    pub fn open(path: &Path, dimension: usize, model_id: &str) -> Result<Self> {
        // Path traversal guard: reject parent directory components (works on all platforms)
        if path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(StoreError::InvalidPath(format!(
                "{} contains '..' which may escape the intended directory",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::canonicalize(parent).map_err(|e| {
                    StoreError::InvalidPath(format!(
                        "parent directory of {} not accessible: {}",
                        path.display(),
                        e
                    ))
                })?;
            }
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        create_schema(&conn)?;
        ensure_identity(&mut conn, path, dimension, model_id)?;

        debug!(path = %path.display(), dimension, "Opened SQLite store");

        Ok(Self {
            index: Arc::new(SqliteIndex {
                conn: Mutex::new(conn),
                path: path.to_path_buf(),
                dimension,
            }),
        })
    }

    /// Run `op` against the index on the blocking pool.
    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteIndex) -> Result<T> + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || op(&index))
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

impl SqliteIndex {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn insert_record(&self, record: &VectorRecord) -> Result<()> {
        validate_embedding(self.dimension, &record.embedding)?;
        let blob = embedding_to_blob(&record.embedding, self.dimension)?;
        let metadata = record
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO memories (id, content, embedding, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![record.id.to_string(), &record.text, &blob, metadata, &now],
        )?;

        debug!(id = %record.id, "Inserted memory");
        Ok(())
    }

    fn nearest(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredMemory>> {
        validate_limit(limit)?;
        validate_embedding(self.dimension, query_embedding)?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, content, embedding, metadata
            FROM memories
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut memories: Vec<ScoredMemory> = Vec::new();
        for row_result in rows {
            let (id, content, blob, metadata) = row_result?;
            let stored_embedding = blob_to_embedding(&blob, self.dimension)?;
            let similarity = cosine_similarity(query_embedding, &stored_embedding)?;

            let id: MemoryId = id
                .parse()
                .map_err(|e| StoreError::InvalidRecord(format!("bad id '{}': {}", id, e)))?;
            let metadata: Option<Metadata> = metadata
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;

            memories.push(ScoredMemory {
                id,
                content,
                similarity,
                metadata,
            });
        }

        memories.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        memories.truncate(limit);

        debug!(k = limit, found = memories.len(), "Nearest-neighbor scan complete");
        Ok(memories)
    }

    fn count_rows(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Local
    }

    fn dimension(&self) -> usize {
        self.index.dimension
    }

    async fn insert(&self, record: &VectorRecord) -> Result<()> {
        let record = record.clone();
        self.run_blocking(move |index| index.insert_record(&record))
            .await
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredMemory>> {
        let embedding = embedding.to_vec();
        self.run_blocking(move |index| index.nearest(&embedding, k))
            .await
    }

    async fn count(&self) -> Result<u64> {
        self.run_blocking(|index| index.count_rows()).await
    }
}
