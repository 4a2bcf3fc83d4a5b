//! memoria - Semantic memory service.
//!
//! Saves free-text memories as embeddings and retrieves the ones closest in meaning
//! to a query. Embeddings come from a local ONNX sentence-transformer; records live
//! in either a local SQLite index or a remote Qdrant collection, chosen by
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use memoria::{Config, MemoryService};
//!
//! # async fn run() -> Result<(), memoria::Error> {
//! let config = Config::load()?;
//! let service = MemoryService::from_config(&config).await?;
//!
//! let id = service.save("The dentist appointment moved to Tuesday").await?;
//! println!("Saved memory: {}", id);
//!
//! for content in service.search("when is the dentist").await? {
//!     println!("{}", content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! `MemoryService` methods take `&self`; share one instance behind an `Arc`.
//! Encoding runs on tokio's blocking pool, so the service must be used from within
//! a tokio runtime.

pub mod config;
pub mod embedding;
pub mod errors;
pub mod memory;
pub mod memory_types;
pub mod server;
pub mod store;

#[cfg(test)]
mod test_utils;

// Re-export public API
pub use config::Config;
pub use embedding::{Embedder, EncodingError, OnnxEmbedder, DEFAULT_EMBEDDING_DIMS};
pub use errors::{Error, ErrorKind};
pub use memory::service::MAX_INPUT_LENGTH;
pub use memory::MemoryService;
pub use memory_types::{MemoryId, Metadata, ScoredMemory, VectorRecord};
pub use store::{
    open_store, BackendKind, QdrantStore, SqliteStore, StoreError, VectorStore, MAX_SEARCH_LIMIT,
};
