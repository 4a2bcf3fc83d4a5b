//! Shared fixtures and the backend-independent save/search suite.
//!
//! Every `check_*` function takes a service over an empty store and asserts one
//! behavior through the public API only, so the same checks run against any
//! `VectorStore` implementation.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use memoria::{Embedder, EncodingError, Error, MemoryService, SqliteStore};
use tempfile::TempDir;

pub const HASH_DIMS: usize = 64;
pub const HASH_MODEL: &str = "test/fnv-bag-of-words";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed with FNV-1a into one of
/// `HASH_DIMS` buckets with a sign taken from the hash's top bit; the result is
/// L2-normalized. Texts sharing words are close, texts sharing none are orthogonal
/// up to bucket collisions.
pub struct HashingEmbedder;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        HASH_MODEL
    }

    fn dimension(&self) -> usize {
        HASH_DIMS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EncodingError> {
        let mut embedding = vec![0.0f32; HASH_DIMS];
        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % HASH_DIMS as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in embedding.iter_mut() {
                *x /= norm;
            }
        }
        Ok(embedding)
    }
}

/// Ten sentences with no meaningful word overlap; each is its own nearest neighbor.
pub const DISTINCT_SENTENCES: [&str; 10] = [
    "rust ownership rules prevent data races",
    "the quick brown fox jumps over the lazy dog",
    "paris is the capital of france",
    "photosynthesis converts sunlight into chemical energy",
    "my dentist appointment is on tuesday",
    "bitcoin price rallied overnight",
    "grandma bakes sourdough bread every sunday",
    "the meeting was moved to conference room b",
    "jupiter is the largest planet in the solar system",
    "remember to water the tomato plants",
];

/// Service over the hashing embedder and a SQLite store inside `dir`.
pub fn local_service(dir: &TempDir, top_k: usize) -> MemoryService {
    let path = dir.path().join("memories.db");
    let store = SqliteStore::open(&path, HASH_DIMS, HASH_MODEL).expect("open sqlite store");
    MemoryService::new(Arc::new(HashingEmbedder), Arc::new(store), top_k)
        .expect("assemble service")
}

pub async fn check_round_trip(service: &MemoryService) {
    for sentence in DISTINCT_SENTENCES {
        service.save(sentence).await.expect("save");
    }

    for sentence in DISTINCT_SENTENCES {
        let results = service.search_with_limit(sentence, 1).await.expect("search");
        assert_eq!(results, vec![sentence.to_string()]);
    }
}

pub async fn check_uniqueness(service: &MemoryService) {
    let first = service.save("water the tomato plants").await.expect("save");
    let second = service.save("water the tomato plants").await.expect("save");
    assert_ne!(first, second);

    let results = service
        .search_scored("water the tomato plants", 5)
        .await
        .expect("search");
    let ids: HashSet<_> = results.iter().map(|m| m.id).collect();
    assert!(ids.contains(&first));
    assert!(ids.contains(&second));
}

pub async fn check_empty_store(service: &MemoryService) {
    let results = service.search("anything at all").await.expect("search");
    assert!(results.is_empty());
}

pub async fn check_ordering(service: &MemoryService) {
    service.save("stock markets fell sharply").await.expect("save");
    service.save("a feline rested on a rug").await.expect("save");
    service.save("the cat sat on the mat").await.expect("save");

    let results = service.search("cat on a mat").await.expect("search");
    assert_eq!(results.len(), 3);
    assert_eq!(results[2], "stock markets fell sharply");
    let first_two: HashSet<&str> = results[..2].iter().map(String::as_str).collect();
    assert!(first_two.contains("the cat sat on the mat"));
    assert!(first_two.contains("a feline rested on a rug"));
}

pub async fn check_top_k_bound(service: &MemoryService) {
    assert_eq!(service.top_k(), 5);
    for sentence in DISTINCT_SENTENCES {
        service.save(sentence).await.expect("save");
    }

    let results = service.search("the planet of data").await.expect("search");
    assert_eq!(results.len(), 5);
    for result in &results {
        assert!(DISTINCT_SENTENCES.contains(&result.as_str()));
    }
    let unique: HashSet<&String> = results.iter().collect();
    assert_eq!(unique.len(), 5);
}

pub async fn check_scores_descending(service: &MemoryService) {
    for sentence in DISTINCT_SENTENCES {
        service.save(sentence).await.expect("save");
    }

    let results = service
        .search_scored("the dentist is on the planet", 10)
        .await
        .expect("search");
    assert_eq!(results.len(), 10);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity - 1e-6);
    }
}

pub async fn check_validation(service: &MemoryService) {
    assert!(matches!(service.save("").await, Err(Error::EmptyInput)));
    assert!(matches!(service.search("").await, Err(Error::EmptyInput)));
    assert!(service.save("").await.unwrap_err().is_bad_input());

    let results = service.search("still empty").await.expect("search");
    assert!(results.is_empty());
}

/// Every check, each against its own fresh service.
///
/// `make_service` returns the service with a guard that must outlive it, such as
/// the temporary directory holding a local store.
pub async fn run_suite<F, Fut, G>(make_service: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = (MemoryService, G)>,
{
    let (service, _guard) = make_service().await;
    check_round_trip(&service).await;
    let (service, _guard) = make_service().await;
    check_uniqueness(&service).await;
    let (service, _guard) = make_service().await;
    check_empty_store(&service).await;
    let (service, _guard) = make_service().await;
    check_ordering(&service).await;
    let (service, _guard) = make_service().await;
    check_top_k_bound(&service).await;
    let (service, _guard) = make_service().await;
    check_scores_descending(&service).await;
    let (service, _guard) = make_service().await;
    check_validation(&service).await;
}
