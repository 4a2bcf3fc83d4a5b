//! Vector store abstraction and its backends.
//!
//! This module provides:
//! - `VectorStore`: insert + nearest-neighbor query, polymorphic over backend
//! - `sqlite`: local persistent index (strongly consistent)
//! - `qdrant`: remote managed index (eventually consistent)
//! - `vectors`: embedding BLOB encoding and cosine similarity

pub mod qdrant;
pub mod sqlite;
pub mod vectors;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::memory_types::{ScoredMemory, VectorRecord};

pub use self::qdrant::QdrantStore;
pub use self::sqlite::SqliteStore;

/// Maximum number of neighbors a single query may request.
pub const MAX_SEARCH_LIMIT: usize = 10_000;

/// Error types for vector store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Embedding length differs from the index dimensionality.
    #[error("Mismatched dimensions: expected {expected} dimensions, got {actual} dimensions")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The existing index was provisioned for a different dimensionality, metric or model.
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// Stored BLOB has the wrong size.
    #[error("Invalid BLOB size: expected {expected} bytes, got {actual} bytes")]
    InvalidBlobSize { expected: usize, actual: usize },

    /// Query limit outside the accepted range.
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Embedding is empty or contains NaN/infinite values.
    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    /// Stored record could not be decoded.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Store location rejected.
    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    /// Remote index request failed (network, timeout, server error).
    #[error("Remote index error: {0}")]
    Remote(String),

    /// Metadata (de)serialization failed.
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store lock.
    #[error("Store lock poisoned")]
    LockPoisoned,

    /// The blocking task running a local store operation panicked or was cancelled.
    #[error("Store worker failed: {0}")]
    Worker(String),
}

impl StoreError {
    /// Configuration faults that no retry can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::DimensionMismatch { .. }
                | StoreError::IndexMismatch(_)
                | StoreError::InvalidPath(_)
        )
    }
}

/// Which vector store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded SQLite file on local disk.
    #[default]
    Local,
    /// Qdrant collection reached over the network.
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(format!("unknown backend '{other}' (expected 'local' or 'remote')")),
        }
    }
}

/// Durable collection of vector records supporting nearest-neighbor queries.
///
/// Implementations own their synchronization: every method takes `&self` and may be
/// called concurrently.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend identity, for logging and diagnostics only.
    fn backend(&self) -> BackendKind;

    /// Dimensionality every stored and queried embedding must have.
    fn dimension(&self) -> usize;

    /// Insert a record. Either the whole record becomes queryable or nothing does.
    async fn insert(&self, record: &VectorRecord) -> Result<(), StoreError>;

    /// Return up to `k` records ordered by decreasing cosine similarity.
    ///
    /// An empty store yields an empty vector.
    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredMemory>, StoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Validate search limit is within acceptable bounds.
pub fn validate_limit(limit: usize) -> Result<(), StoreError> {
    if limit == 0 {
        return Err(StoreError::InvalidLimit(
            "Limit must be greater than 0".to_string(),
        ));
    }
    if limit > MAX_SEARCH_LIMIT {
        return Err(StoreError::InvalidLimit(format!(
            "Limit {} exceeds maximum allowed ({})",
            limit, MAX_SEARCH_LIMIT
        )));
    }
    Ok(())
}

/// Check an embedding against the index dimensionality and reject non-finite values.
pub fn validate_embedding(expected: usize, embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.is_empty() {
        return Err(StoreError::InvalidEmbedding("empty vector".to_string()));
    }
    if embedding.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(StoreError::InvalidEmbedding(
            "Vector contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

/// Open the backend selected by `config.backend`.
///
/// `model_id` is recorded by backends that can remember which embedder filled them.
pub async fn open_store(
    config: &Config,
    model_id: &str,
) -> Result<Arc<dyn VectorStore>, StoreError> {
    let store: Arc<dyn VectorStore> = match config.backend {
        BackendKind::Local => Arc::new(SqliteStore::open(
            &config.database_path,
            config.embedding_dims,
            model_id,
        )?),
        BackendKind::Remote => {
            Arc::new(QdrantStore::connect(&config.remote, config.embedding_dims).await?)
        }
    };

    info!(
        backend = %store.backend(),
        dimension = store.dimension(),
        "Vector store opened"
    );
    Ok(store)
}
