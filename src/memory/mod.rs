//! Memory service orchestrating embedding and vector store operations.
//!
//! Provides the save and search API: text in, embedding generated on the blocking
//! pool, record persisted through whichever [`VectorStore`](crate::store::VectorStore)
//! backs the service.

mod save;
mod search;

// pub(crate): module internals hidden; public items re-exported explicitly via lib.rs
pub(crate) mod service;

pub use service::MemoryService;
