//! On-disk embedding encoding and exact cosine ranking for the local index.

use super::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Serialize an embedding as little-endian f32 bytes.
///
/// # Errors
///
/// Returns `StoreError::DimensionMismatch` if the embedding is not `dims` long.
pub fn embedding_to_blob(embedding: &[f32], dims: usize) -> Result<Vec<u8>> {
    if embedding.len() != dims {
        return Err(StoreError::DimensionMismatch {
            expected: dims,
            actual: embedding.len(),
        });
    }
    let mut blob = Vec::with_capacity(dims * F32_BYTES);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    Ok(blob)
}

/// Decode a stored embedding.
///
/// # Errors
///
/// Returns `StoreError::InvalidBlobSize` unless the blob holds exactly `dims` floats.
pub fn blob_to_embedding(blob: &[u8], dims: usize) -> Result<Vec<f32>> {
    if blob.len() != dims * F32_BYTES {
        return Err(StoreError::InvalidBlobSize {
            expected: dims * F32_BYTES,
            actual: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(F32_BYTES)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}

/// Cosine similarity of two equal-length embeddings, accumulated in f64.
///
/// A zero vector is orthogonal to everything (similarity 0.0).
///
/// # Errors
///
/// Returns `StoreError::DimensionMismatch` when the lengths differ and
/// `StoreError::InvalidEmbedding` for empty input or non-finite components.
pub fn cosine_similarity(query: &[f32], stored: &[f32]) -> Result<f64> {
    if query.len() != stored.len() {
        return Err(StoreError::DimensionMismatch {
            expected: query.len(),
            actual: stored.len(),
        });
    }
    if query.is_empty() {
        return Err(StoreError::InvalidEmbedding("empty vector".to_string()));
    }

    let (mut dot, mut query_sq, mut stored_sq) = (0.0f64, 0.0f64, 0.0f64);
    for (&q, &s) in query.iter().zip(stored) {
        if !q.is_finite() || !s.is_finite() {
            return Err(StoreError::InvalidEmbedding(
                "Vector contains NaN or infinite values".to_string(),
            ));
        }
        let (q, s) = (f64::from(q), f64::from(s));
        dot += q * s;
        query_sq += q * q;
        stored_sq += s * s;
    }

    if query_sq == 0.0 || stored_sq == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (query_sq.sqrt() * stored_sq.sqrt()))
}
