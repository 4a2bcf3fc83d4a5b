//! Qdrant-backed remote managed index.
//!
//! Records are single points in one cosine collection; the memory text and optional
//! metadata ride along in the point payload. The service cannot observe when a write
//! becomes visible to queries unless `wait_for_write` is set.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_config, CountPointsBuilder, CreateCollectionBuilder,
    Distance, PointId, PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};

use super::{validate_embedding, validate_limit, BackendKind, StoreError, VectorStore};
use crate::config::RemoteConfig;
use crate::memory_types::{MemoryId, Metadata, ScoredMemory, VectorRecord};

pub type Result<T> = std::result::Result<T, StoreError>;

const PAYLOAD_CONTENT: &str = "content";
const PAYLOAD_METADATA: &str = "metadata";
const PAYLOAD_CREATED_AT: &str = "created_at";

/// Remote vector index held in a Qdrant collection.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
    wait_for_write: bool,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .field("wait_for_write", &self.wait_for_write)
            .finish()
    }
}

impl QdrantStore {
    /// Connect to Qdrant and make sure the collection exists with the expected shape.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Remote` if the server cannot be reached, or
    /// `StoreError::IndexMismatch` if the collection exists with another
    /// dimensionality or distance metric.
    pub async fn connect(config: &RemoteConfig, dimension: usize) -> Result<Self> {
        debug!(url = %config.url, collection = %config.collection, "Connecting to Qdrant");

        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Remote(format!("Failed to create Qdrant client: {}", e)))?;

        let store = Self {
            client,
            collection: config.collection.clone(),
            dimension,
            wait_for_write: config.wait_for_write,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| {
                StoreError::Remote(format!("Failed to check collection existence: {}", e))
            })?;

        if exists {
            return self.verify_collection().await;
        }

        info!(collection = %self.collection, dimension = self.dimension, "Creating collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to create collection: {}", e)))?;

        Ok(())
    }

    async fn verify_collection(&self) -> Result<()> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to get collection info: {}", e)))?;

        let params = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        match params {
            Some(vectors_config::Config::Params(params)) => {
                check_vector_params(&self.collection, self.dimension, params.size, params.distance)
            }
            Some(vectors_config::Config::ParamsMap(_)) => Err(StoreError::IndexMismatch(format!(
                "collection '{}' uses named vectors, expected a single unnamed vector",
                self.collection
            ))),
            None => Err(StoreError::IndexMismatch(format!(
                "collection '{}' reports no vector configuration",
                self.collection
            ))),
        }
    }
}

/// Compare an existing collection's vector parameters against what this service writes.
fn check_vector_params(collection: &str, dimension: usize, size: u64, distance: i32) -> Result<()> {
    if size != dimension as u64 {
        return Err(StoreError::IndexMismatch(format!(
            "collection '{}' holds {}-dimensional vectors, configured for {}",
            collection, size, dimension
        )));
    }
    if distance != Distance::Cosine as i32 {
        return Err(StoreError::IndexMismatch(format!(
            "collection '{}' uses distance {:?}, expected Cosine",
            collection,
            Distance::try_from(distance).unwrap_or(Distance::UnknownDistance)
        )));
    }
    Ok(())
}

fn build_payload(record: &VectorRecord) -> Result<HashMap<String, Value>> {
    let mut payload: HashMap<String, Value> = [
        (PAYLOAD_CONTENT.to_string(), Value::from(record.text.clone())),
        (
            PAYLOAD_CREATED_AT.to_string(),
            Value::from(Utc::now().to_rfc3339()),
        ),
    ]
    .into_iter()
    .collect();

    if let Some(metadata) = &record.metadata {
        payload.insert(
            PAYLOAD_METADATA.to_string(),
            Value::from(serde_json::to_string(metadata)?),
        );
    }

    Ok(payload)
}

fn memory_id_from_point(point_id: Option<PointId>) -> Result<MemoryId> {
    match point_id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid
            .parse()
            .map_err(|e| StoreError::InvalidRecord(format!("bad point id '{}': {}", uuid, e))),
        Some(PointIdOptions::Num(n)) => Err(StoreError::InvalidRecord(format!(
            "numeric point id {} was not written by this service",
            n
        ))),
        None => Err(StoreError::InvalidRecord("point without id".to_string())),
    }
}

fn scored_from_point(point: ScoredPoint) -> Result<ScoredMemory> {
    let id = memory_id_from_point(point.id)?;
    let content = get_string(&point.payload, PAYLOAD_CONTENT).ok_or_else(|| {
        StoreError::InvalidRecord(format!("point {} has no '{}' payload", id, PAYLOAD_CONTENT))
    })?;
    let metadata: Option<Metadata> = get_string(&point.payload, PAYLOAD_METADATA)
        .map(|raw| serde_json::from_str(&raw))
        .transpose()?;

    Ok(ScoredMemory {
        id,
        content,
        similarity: f64::from(point.score),
        metadata,
    })
}

fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert(&self, record: &VectorRecord) -> Result<()> {
        validate_embedding(self.dimension, &record.embedding)?;

        let point = PointStruct::new(
            record.id.to_string(),
            record.embedding.clone(),
            build_payload(record)?,
        );

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(&self.collection, vec![point]).wait(self.wait_for_write),
            )
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to upsert memory: {}", e)))?;

        debug!(id = %record.id, wait = self.wait_for_write, "Upserted memory");
        Ok(())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredMemory>> {
        validate_limit(k)?;
        validate_embedding(self.dimension, embedding)?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to search memories: {}", e)))?;

        let mut memories = Vec::with_capacity(response.result.len());
        for point in response.result {
            match scored_from_point(point) {
                Ok(memory) => memories.push(memory),
                Err(StoreError::InvalidRecord(reason)) => {
                    warn!(collection = %self.collection, %reason, "Skipping unreadable point");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(k, found = memories.len(), "Remote search complete");
        Ok(memories)
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to count points: {}", e)))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}
