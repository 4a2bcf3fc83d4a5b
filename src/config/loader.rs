//! Configuration file loading and parsing.

use crate::errors::Error;
use crate::store::BackendKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths;

/// Configuration loaded from TOML file.
///
/// Every key is optional; absent keys keep their default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub backend: Option<BackendKind>,

    pub database_path: Option<PathBuf>,

    pub embedding_model: Option<String>,

    pub model_cache: Option<PathBuf>,

    pub embedding_dims: Option<usize>,

    pub top_k: Option<usize>,

    #[serde(default)]
    pub remote: RemoteSection,

    #[serde(default)]
    pub server: ServerSection,
}

/// `[remote]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection: Option<String>,
    pub timeout_secs: Option<u64>,
    pub wait_for_write: Option<bool>,
}

/// `[server]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub bind_address: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
}

/// Parse configuration from TOML text.
pub fn parse(content: &str, origin: &Path) -> Result<ConfigFile, Error> {
    toml::from_str(content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file {}: {e}",
            origin.display()
        ))
    })
}

/// Load configuration from TOML file.
///
/// An explicit path must exist. Without one, the default location is used if a file
/// is present there.
pub fn load_from_file(explicit: Option<&Path>) -> Result<Option<ConfigFile>, Error> {
    let config_path = match explicit {
        Some(path) => {
            let path = paths::expand_home(path);
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            path
        }
        None => paths::default_config_file(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {e}",
                config_path.display()
            ))
        })?;

        Ok(Some(parse(&content, &config_path)?))
    } else {
        Ok(None)
    }
}
