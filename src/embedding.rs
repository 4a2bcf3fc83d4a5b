//! Text-to-vector encoding.
//!
//! The [`Embedder`] trait is the seam the memory service depends on. The production
//! implementation, [`OnnxEmbedder`], runs a sentence-transformer exported to ONNX with
//! mean pooling and L2 normalization.

use std::path::Path;
use std::sync::Mutex;

use hf_hub::api::sync::ApiBuilder;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use thiserror::Error;
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Embedding dimensions of the default model (paraphrase-MiniLM-L3-v2).
pub const DEFAULT_EMBEDDING_DIMS: usize = 384;

/// Default Hugging Face model identifier.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/paraphrase-MiniLM-L3-v2";

/// Token limit assumed when a model does not publish `max_position_embeddings`.
///
/// 512 is the BERT-family position table size most sentence-transformers inherit.
pub const MAX_MODEL_TOKENS: usize = 512;

/// Model types whose position ids start after the padding index.
const OFFSET_POSITION_MODELS: &[&str] = &["roberta", "xlm-roberta", "camembert"];

/// Errors raised while loading a model or encoding text.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// HuggingFace Hub error.
    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::sync::ApiError),

    /// Tokenization error.
    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    /// ONNX runtime error.
    #[error("ONNX runtime error: {0}")]
    Onnx(#[from] ort::Error),

    /// Model produced output we cannot interpret.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Input exceeds the model's token limit.
    #[error("Input too long: {actual_tokens} tokens (model limit {max_tokens})")]
    InputTooLong {
        max_tokens: usize,
        actual_tokens: usize,
    },

    /// Model hidden size does not match the configured embedding dimensionality.
    #[error("Model produces {actual}-dimensional embeddings, configured for {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The blocking worker running the encoder failed.
    #[error("Encoding worker failed: {0}")]
    Worker(String),
}

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic for a given model and safe to call from
/// many threads at once.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Encode a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EncodingError>;
}

/// ONNX sentence-transformer embedder.
///
/// The session sits behind a mutex because inference needs exclusive access to the
/// session's tensor allocations; callers share the embedder freely.
pub struct OnnxEmbedder {
    model_id: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    requires_token_type_ids: bool,
    max_tokens: usize,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_id", &self.model_id)
            .field("dimension", &self.dimension)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbedder {
    /// Load model from cache or download on first use.
    ///
    /// Blocking: downloads use the synchronous hub client. Files are cached in
    /// `cache_dir` and only downloaded once.
    ///
    /// A probe encoding runs before returning so that a model whose hidden size
    /// differs from `dimension` fails here, at startup, rather than on the first save.
    pub fn load(model_id: &str, cache_dir: &Path, dimension: usize) -> Result<Self, EncodingError> {
        info!(model = model_id, cache = %cache_dir.display(), "Loading embedding model");

        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .build()?;
        let repo = api.model(model_id.to_string());

        let model_path = repo
            .get("onnx/model.onnx")
            .or_else(|_| repo.get("model.onnx"))?;
        let tokenizer_path = repo.get("tokenizer.json")?;

        let max_tokens = match repo.get("config.json") {
            Ok(config_path) => std::fs::read_to_string(&config_path)
                .ok()
                .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
                .and_then(|config| max_tokens_from_config(&config)),
            Err(e) => {
                debug!(model = model_id, error = %e, "No model config.json");
                None
            }
        }
        .unwrap_or(MAX_MODEL_TOKENS);

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
        // Over-long inputs are rejected in `embed`, never silently cut.
        tokenizer.with_padding(None).with_truncation(None)?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(ort::Error::from)?
            .commit_from_file(&model_path)?;

        let requires_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let embedder = OnnxEmbedder {
            model_id: model_id.to_string(),
            session: Mutex::new(session),
            tokenizer,
            requires_token_type_ids,
            max_tokens,
            dimension,
        };

        embedder.embed("dimension probe")?;
        info!(model = model_id, dimension, max_tokens, "Embedding model ready");

        Ok(embedder)
    }
}

impl Embedder for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate an L2-normalized embedding for a single text.
    ///
    /// Empty strings return the zero vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EncodingError> {
        if text.is_empty() {
            return Ok(vec![0.0f32; self.dimension]);
        }

        let encoding = self.tokenizer.encode(text, true)?;
        let input_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        if input_ids.is_empty() {
            return Ok(vec![0.0f32; self.dimension]);
        }

        let seq_len = input_ids.len();
        if seq_len > self.max_tokens {
            return Err(EncodingError::InputTooLong {
                max_tokens: self.max_tokens,
                actual_tokens: seq_len,
            });
        }

        let input_ids_vec: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

        let input_ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids_vec))?;
        let attention_mask_tensor = Tensor::from_array(([1usize, seq_len], attention_mask_vec))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EncodingError::Worker("embedding session lock poisoned".to_string()))?;

        let outputs = if self.requires_token_type_ids {
            let token_type_ids_vec: Vec<i64> = vec![0i64; seq_len];
            let token_type_ids_tensor =
                Tensor::from_array(([1usize, seq_len], token_type_ids_vec))?;
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])?
        } else {
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])?
        };

        let last_hidden_state = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .ok_or_else(|| {
                EncodingError::Inference(
                    "Output tensor 'last_hidden_state' or 'token_embeddings' not found".to_string(),
                )
            })?
            .try_extract_tensor::<f32>()?;

        let (shape, data) = last_hidden_state;
        if shape.len() != 3 {
            return Err(EncodingError::Inference(format!(
                "Expected 3D output (batch, seq_len, hidden), got {:?}",
                shape
            )));
        }

        let batch_size = shape[0] as usize;
        let hidden_dim = shape[2] as usize;

        if batch_size != 1 {
            return Err(EncodingError::Inference(format!(
                "Unexpected output shape: {:?}, batch=1 expected",
                shape
            )));
        }
        if hidden_dim != self.dimension {
            return Err(EncodingError::DimensionMismatch {
                expected: self.dimension,
                actual: hidden_dim,
            });
        }

        let pooled = mean_pool(data, attention_mask, seq_len, hidden_dim);
        debug!(tokens = seq_len, "Encoded text");

        Ok(l2_normalize(&pooled))
    }
}

/// Longest token sequence a model accepts, from its Hugging Face `config.json`.
///
/// Returns `None` when `max_position_embeddings` is missing or unusable.
fn max_tokens_from_config(config: &serde_json::Value) -> Option<usize> {
    let positions = config.get("max_position_embeddings")?.as_u64()?;
    let positions = usize::try_from(positions).ok()?;

    let offset = match config.get("model_type").and_then(|t| t.as_str()) {
        Some(model_type) if OFFSET_POSITION_MODELS.contains(&model_type) => 2,
        _ => 0,
    };

    positions.checked_sub(offset).filter(|&limit| limit > 0)
}

/// Average token vectors, weighting each by its attention mask value.
fn mean_pool(data: &[f32], attention_mask: &[u32], seq_len: usize, hidden_dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_dim];

    for (token_idx, chunk) in data.chunks(hidden_dim).take(seq_len).enumerate() {
        let mask_value = attention_mask.get(token_idx).copied().unwrap_or(0) as f32;

        for (dim, pooled_value) in pooled.iter_mut().enumerate() {
            *pooled_value += chunk[dim] * mask_value;
        }
    }

    let mask_sum: f32 = attention_mask
        .iter()
        .take(seq_len)
        .map(|&m| m as f32)
        .sum::<f32>()
        .max(1e-9);

    for value in pooled.iter_mut() {
        *value /= mask_sum;
    }

    pooled
}

pub(crate) fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    let norm = norm.max(1e-9);

    vec.iter().map(|&x| x / norm).collect()
}
