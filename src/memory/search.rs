//! Semantic search over saved memories.

use tracing::debug;

use crate::errors::Error;
use crate::memory_types::ScoredMemory;

use super::service::{validate_top_k, MemoryService};

impl MemoryService {
    #[must_use = "handle the error or results may be lost"]
    /// Return the texts of the `top_k` memories closest in meaning to `query`.
    ///
    /// Results are ordered most similar first; fewer come back when fewer are stored.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Query is empty or whitespace-only
    /// - Query exceeds 100,000 bytes
    /// - Embedding generation fails
    /// - The store query fails
    pub async fn search(&self, query: &str) -> Result<Vec<String>, Error> {
        self.search_with_limit(query, self.top_k).await
    }

    #[must_use = "handle the error or results may be lost"]
    /// Like [`search`](Self::search) with an explicit result count.
    pub async fn search_with_limit(&self, query: &str, k: usize) -> Result<Vec<String>, Error> {
        let memories = self.search_scored(query, k).await?;
        Ok(memories.into_iter().map(|m| m.content).collect())
    }

    #[must_use = "handle the error or results may be lost"]
    /// Search and keep identifiers, similarity scores and metadata.
    ///
    /// Leading and trailing whitespace in the query is ignored.
    pub async fn search_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredMemory>, Error> {
        Self::validate_input_length(query)?;
        validate_top_k(k)?;

        let query = query.trim();
        let embedding = self.encode(query.to_string()).await?;
        let memories = self.store.query_nearest(&embedding, k).await?;

        debug!(k, found = memories.len(), "Searched memories");
        Ok(memories)
    }
}
