//! Environment variable overrides for configuration.

use crate::errors::Error;

use super::env_parser::{
    override_bool, override_list, override_optional_string, override_parsed, override_path,
    override_string,
};
use super::Config;

pub const BACKEND: &str = "MEMORIA_BACKEND";
pub const DATABASE_PATH: &str = "MEMORIA_DATABASE_PATH";
pub const EMBEDDING_MODEL: &str = "MEMORIA_EMBEDDING_MODEL";
pub const MODEL_CACHE: &str = "MEMORIA_MODEL_CACHE";
pub const EMBEDDING_DIMS: &str = "MEMORIA_EMBEDDING_DIMS";
pub const TOP_K: &str = "MEMORIA_TOP_K";
pub const QDRANT_URL: &str = "MEMORIA_QDRANT_URL";
pub const QDRANT_API_KEY: &str = "MEMORIA_QDRANT_API_KEY";
pub const QDRANT_COLLECTION: &str = "MEMORIA_QDRANT_COLLECTION";
pub const QDRANT_TIMEOUT_SECS: &str = "MEMORIA_QDRANT_TIMEOUT_SECS";
pub const QDRANT_WAIT: &str = "MEMORIA_QDRANT_WAIT";
pub const BIND_ADDRESS: &str = "MEMORIA_BIND_ADDRESS";
pub const ALLOWED_ORIGINS: &str = "MEMORIA_ALLOWED_ORIGINS";

/// Every variable read by [`apply_env_overrides`].
pub const ENV_VARS: [&str; 13] = [
    BACKEND,
    DATABASE_PATH,
    EMBEDDING_MODEL,
    MODEL_CACHE,
    EMBEDDING_DIMS,
    TOP_K,
    QDRANT_URL,
    QDRANT_API_KEY,
    QDRANT_COLLECTION,
    QDRANT_TIMEOUT_SECS,
    QDRANT_WAIT,
    BIND_ADDRESS,
    ALLOWED_ORIGINS,
];

/// Apply environment variable overrides to configuration.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), Error> {
    override_parsed(BACKEND, &mut config.backend)?;
    override_path(DATABASE_PATH, &mut config.database_path)?;
    override_string(EMBEDDING_MODEL, &mut config.embedding_model)?;
    override_path(MODEL_CACHE, &mut config.model_cache)?;
    override_parsed(EMBEDDING_DIMS, &mut config.embedding_dims)?;
    override_parsed(TOP_K, &mut config.top_k)?;

    override_string(QDRANT_URL, &mut config.remote.url)?;
    override_optional_string(QDRANT_API_KEY, &mut config.remote.api_key)?;
    override_string(QDRANT_COLLECTION, &mut config.remote.collection)?;
    override_parsed(QDRANT_TIMEOUT_SECS, &mut config.remote.timeout_secs)?;
    override_bool(QDRANT_WAIT, &mut config.remote.wait_for_write)?;

    override_parsed(BIND_ADDRESS, &mut config.server.bind_address)?;
    override_list(ALLOWED_ORIGINS, &mut config.server.allowed_origins)?;
    Ok(())
}
