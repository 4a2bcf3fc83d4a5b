//! Saving memories.

use tracing::debug;

use crate::errors::Error;
use crate::memory_types::{MemoryId, Metadata, VectorRecord};

use super::service::MemoryService;

impl MemoryService {
    #[must_use = "handle the error or the memory may not have been saved"]
    /// Save a memory and return its new identifier.
    ///
    /// The text is stored verbatim. Saving the same text twice creates two records.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Input is empty or whitespace-only
    /// - Input exceeds 100,000 bytes
    /// - Embedding generation fails
    /// - The store rejects or fails the insert
    pub async fn save(&self, content: &str) -> Result<MemoryId, Error> {
        self.save_with_metadata(content, None).await
    }

    #[must_use = "handle the error or the memory may not have been saved"]
    /// Save a memory with optional key-value annotations.
    ///
    /// Validation runs before the embedder or the store is touched.
    pub async fn save_with_metadata(
        &self,
        content: &str,
        metadata: Option<Metadata>,
    ) -> Result<MemoryId, Error> {
        Self::validate_input_length(content)?;
        Self::validate_metadata(metadata.as_ref())?;

        let embedding = self.encode(content.to_string()).await?;

        let record = VectorRecord {
            id: MemoryId::new(),
            embedding,
            text: content.to_string(),
            metadata,
        };
        self.store.insert(&record).await?;

        debug!(id = %record.id, bytes = content.len(), "Saved memory");
        Ok(record.id)
    }
}
