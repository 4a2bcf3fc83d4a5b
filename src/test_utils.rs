//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use crate::embedding::{l2_normalize, Embedder, EncodingError};
use crate::memory::MemoryService;
use crate::store::SqliteStore;

pub const TEST_DIMS: usize = 4;
pub const TEST_MODEL: &str = "test/keywords";

/// Puts "cat", "dog" and "car" on their own axes; everything else on the last one.
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for KeywordEmbedder {
    fn model_id(&self) -> &str {
        TEST_MODEL
    }

    fn dimension(&self) -> usize {
        TEST_DIMS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EncodingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = text.to_lowercase();
        let mut vec = vec![0.0f32; TEST_DIMS];
        for (axis, word) in ["cat", "dog", "car"].iter().enumerate() {
            if text.contains(word) {
                vec[axis] += 1.0;
            }
        }
        if vec.iter().all(|&x| x == 0.0) {
            vec[TEST_DIMS - 1] = 1.0;
        }
        Ok(l2_normalize(&vec))
    }
}

/// SQLite store in a fresh temporary directory.
pub fn sqlite_store(dir: &TempDir) -> Arc<SqliteStore> {
    let path = dir.path().join("test.db");
    Arc::new(SqliteStore::open(&path, TEST_DIMS, TEST_MODEL).unwrap())
}

/// Service over a keyword embedder and a temporary SQLite store.
///
/// Keep the returned directory alive for as long as the service is used.
pub fn keyword_service(top_k: usize) -> (MemoryService, Arc<KeywordEmbedder>, TempDir) {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(KeywordEmbedder::new());
    let service = MemoryService::new(embedder.clone(), sqlite_store(&dir), top_k).unwrap();
    (service, embedder, dir)
}
