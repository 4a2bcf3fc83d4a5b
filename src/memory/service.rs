//! Memory service struct combining embedding generation and persistence.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::embedding::{Embedder, EncodingError, OnnxEmbedder};
use crate::errors::Error;
use crate::memory_types::Metadata;
use crate::store::{open_store, BackendKind, VectorStore, MAX_SEARCH_LIMIT};

/// Maximum allowed input length (100,000 bytes).
pub const MAX_INPUT_LENGTH: usize = 100_000;

/// Save and search free-text memories by meaning.
///
/// Holds no record state of its own: the embedder and the store are shared
/// read-mostly handles, so one service value (behind an `Arc`) serves any number of
/// concurrent requests.
pub struct MemoryService {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) store: Arc<dyn VectorStore>,
    pub(crate) top_k: usize,
}

impl std::fmt::Debug for MemoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryService")
            .field("model", &self.embedder.model_id())
            .field("backend", &self.store.backend())
            .field("dimension", &self.store.dimension())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl MemoryService {
    /// Assemble a service from an embedder and a store.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `top_k` is 0 or exceeds `MAX_SEARCH_LIMIT`
    /// - The embedder and store disagree on dimensionality
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Result<Self, Error> {
        validate_top_k(top_k).map_err(|e| Error::Config(e.to_string()))?;

        if embedder.dimension() != store.dimension() {
            return Err(Error::Config(format!(
                "Embedder '{}' produces {}-dimensional vectors but the {} store holds {}",
                embedder.model_id(),
                embedder.dimension(),
                store.backend(),
                store.dimension()
            )));
        }

        Ok(Self {
            embedder,
            store,
            top_k,
        })
    }

    /// Startup phase: load the embedding model and open the configured store.
    ///
    /// The model download and ONNX session setup block, so they run on tokio's
    /// blocking pool.
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        config.ensure_directories()?;

        let model_id = config.embedding_model.clone();
        let cache_dir = config.model_cache.clone();
        let dims = config.embedding_dims;
        let embedder =
            tokio::task::spawn_blocking(move || OnnxEmbedder::load(&model_id, &cache_dir, dims))
                .await
                .map_err(|e| EncodingError::Worker(e.to_string()))??;

        let store = open_store(config, embedder.model_id()).await?;
        let service = Self::new(Arc::new(embedder), store, config.top_k)?;

        info!(
            model = %service.embedder.model_id(),
            backend = %service.store.backend(),
            top_k = service.top_k,
            "Memory service ready"
        );
        Ok(service)
    }

    /// Number of results `search` returns.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn backend(&self) -> BackendKind {
        self.store.backend()
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Number of stored memories.
    pub async fn count(&self) -> Result<u64, Error> {
        Ok(self.store.count().await?)
    }

    /// Validate input length (rejects empty and whitespace-only inputs).
    pub(crate) fn validate_input_length(text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        if text.len() > MAX_INPUT_LENGTH {
            return Err(Error::InputTooLong {
                max_length: MAX_INPUT_LENGTH,
                actual_length: text.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn validate_metadata(metadata: Option<&Metadata>) -> Result<(), Error> {
        if let Some(metadata) = metadata {
            if metadata.keys().any(|key| key.trim().is_empty()) {
                return Err(Error::Validation(
                    "Metadata keys cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Run the embedder on the blocking pool.
    pub(crate) async fn encode(&self, text: String) -> Result<Vec<f32>, Error> {
        let embedder = Arc::clone(&self.embedder);
        let embedding = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| EncodingError::Worker(e.to_string()))??;
        Ok(embedding)
    }
}

/// Validate a result count against `1..=MAX_SEARCH_LIMIT`.
pub(crate) fn validate_top_k(k: usize) -> Result<(), Error> {
    if k == 0 || k > MAX_SEARCH_LIMIT {
        return Err(Error::Validation(format!(
            "Result count {} out of range (must be between 1 and {})",
            k, MAX_SEARCH_LIMIT
        )));
    }
    Ok(())
}
