//! Configuration system for memoria.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;

use crate::embedding::{DEFAULT_EMBEDDING_DIMS, DEFAULT_EMBEDDING_MODEL};
use crate::errors::Error;
use crate::store::BackendKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub use loader::ConfigFile;
pub use validation::MAX_EMBEDDING_DIMS;

/// Number of results a search returns unless told otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Connection settings for the remote (Qdrant) backend.
#[derive(Clone)]
pub struct RemoteConfig {
    /// gRPC endpoint of the Qdrant server.
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Block each insert until the point is indexed and searchable.
    pub wait_for_write: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "memories".to_string(),
            timeout_secs: 10,
            wait_for_write: false,
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("collection", &self.collection)
            .field("timeout_secs", &self.timeout_secs)
            .field("wait_for_write", &self.wait_for_write)
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    /// Origins allowed by CORS; an entry ending in `*` matches by prefix.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            allowed_origins: vec!["chrome-extension://*".to_string()],
        }
    }
}

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which vector store backs the service.
    pub backend: BackendKind,

    /// Path to the SQLite database (local backend).
    pub database_path: PathBuf,

    /// HuggingFace embedding model identifier.
    pub embedding_model: String,

    /// Directory for caching ONNX models.
    pub model_cache: PathBuf,

    /// Length of the vectors the embedding model produces.
    pub embedding_dims: usize,

    /// Number of results returned by a search.
    pub top_k: usize,

    pub remote: RemoteConfig,

    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        let memoria_dir = paths::data_dir();

        Self {
            backend: BackendKind::default(),
            database_path: memoria_dir.join("memories.db"),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            model_cache: memoria_dir.join("models"),
            embedding_dims: DEFAULT_EMBEDDING_DIMS,
            top_k: DEFAULT_TOP_K,
            remote: RemoteConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(None)
    }

    /// Load configuration with defaults, file values, and environment overrides.
    ///
    /// `path` names an explicit config file, which must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self, Error> {
        let file_config = loader::load_from_file(path)?;

        let mut config = Config::default();

        if let Some(file) = file_config {
            config.merge_from_file(file)?;
        }

        overrides::apply_env_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) -> Result<(), Error> {
        if let Some(backend) = file.backend {
            self.backend = backend;
        }
        if let Some(path) = file.database_path {
            self.database_path = paths::expand_home(&path);
        }
        if let Some(model) = file.embedding_model {
            self.embedding_model = model;
        }
        if let Some(path) = file.model_cache {
            self.model_cache = paths::expand_home(&path);
        }
        if let Some(dims) = file.embedding_dims {
            self.embedding_dims = dims;
        }
        if let Some(top_k) = file.top_k {
            self.top_k = top_k;
        }

        let remote = file.remote;
        if let Some(url) = remote.url {
            self.remote.url = url;
        }
        if remote.api_key.is_some() {
            self.remote.api_key = remote.api_key;
        }
        if let Some(collection) = remote.collection {
            self.remote.collection = collection;
        }
        if let Some(timeout) = remote.timeout_secs {
            self.remote.timeout_secs = timeout;
        }
        if let Some(wait) = remote.wait_for_write {
            self.remote.wait_for_write = wait;
        }

        let server = file.server;
        if let Some(bind) = server.bind_address {
            self.server.bind_address = bind.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid bind_address '{bind}': {e}"))
            })?;
        }
        if let Some(origins) = server.allowed_origins {
            self.server.allowed_origins = origins;
        }

        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        validation::ConfigValidator::new(self).validate()
    }

    /// Ensure parent directories for database and cache paths exist.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        if self.backend == BackendKind::Local {
            if let Some(parent) = self.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::Config(format!(
                            "Failed to create database directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }

        if !self.model_cache.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.model_cache).map_err(|e| {
                Error::Config(format!(
                    "Failed to create model cache directory {}: {e}",
                    self.model_cache.display()
                ))
            })?;
        }

        Ok(())
    }
}
