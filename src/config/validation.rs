//! Configuration validation logic.

use crate::errors::Error;
use crate::store::{BackendKind, MAX_SEARCH_LIMIT};

use super::Config;

/// Largest embedding dimensionality accepted.
pub const MAX_EMBEDDING_DIMS: usize = 8192;

/// Validates configuration values.
pub struct ConfigValidator<'a> {
    config: &'a Config,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Validate all configuration values for correctness and constraints.
    ///
    /// Checks that:
    /// - Embedding model and paths are not empty
    /// - Embedding dimensionality is between 1 and `MAX_EMBEDDING_DIMS`
    /// - Top-k is between 1 and `MAX_SEARCH_LIMIT`
    /// - Remote settings are usable when the remote backend is selected
    /// - Every allowed origin is non-empty
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any validation check fails.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_embedding_model()?;
        self.validate_paths()?;
        self.validate_embedding_dims()?;
        self.validate_top_k()?;
        self.validate_remote()?;
        self.validate_server()?;

        Ok(())
    }

    fn validate_embedding_model(&self) -> Result<(), Error> {
        if self.config.embedding_model.trim().is_empty() {
            return Err(Error::Config("Embedding model cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_paths(&self) -> Result<(), Error> {
        if self.config.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }
        if self.config.model_cache.as_os_str().is_empty() {
            return Err(Error::Config("Model cache path cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_embedding_dims(&self) -> Result<(), Error> {
        let dims = self.config.embedding_dims;
        if dims == 0 || dims > MAX_EMBEDDING_DIMS {
            return Err(Error::Config(format!(
                "Invalid embedding dimensions: {} (must be between 1 and {})",
                dims, MAX_EMBEDDING_DIMS
            )));
        }

        Ok(())
    }

    fn validate_top_k(&self) -> Result<(), Error> {
        let top_k = self.config.top_k;
        if top_k == 0 || top_k > MAX_SEARCH_LIMIT {
            return Err(Error::Config(format!(
                "Invalid top_k: {} (must be between 1 and {})",
                top_k, MAX_SEARCH_LIMIT
            )));
        }

        Ok(())
    }

    fn validate_remote(&self) -> Result<(), Error> {
        if self.config.backend != BackendKind::Remote {
            return Ok(());
        }

        let remote = &self.config.remote;
        if remote.url.trim().is_empty() {
            return Err(Error::Config("Remote URL cannot be empty".to_string()));
        }
        if remote.collection.trim().is_empty() {
            return Err(Error::Config(
                "Remote collection cannot be empty".to_string(),
            ));
        }
        if remote.timeout_secs == 0 {
            return Err(Error::Config(
                "Remote timeout must be greater than 0 seconds".to_string(),
            ));
        }
        if remote
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(Error::Config("Remote API key cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), Error> {
        if self
            .config
            .server
            .allowed_origins
            .iter()
            .any(|origin| origin.trim().is_empty())
        {
            return Err(Error::Config(
                "Allowed origins cannot contain empty entries".to_string(),
            ));
        }

        Ok(())
    }
}
