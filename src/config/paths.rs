//! Default locations and `~` expansion for configured paths.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "memoria";

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Where the database and model cache live by default: `~/.memoria`.
pub fn data_dir() -> PathBuf {
    home().join(format!(".{APP_DIR}"))
}

/// `<config_dir>/memoria/config.toml`, falling back to `~/.config` when the platform
/// reports no config directory.
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home().join(".config"))
        .join(APP_DIR)
        .join("config.toml")
}

/// Replace a leading `~` component with the home directory.
///
/// Only a whole first component counts: `~backup/x` and `/data/~/x` are left alone.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
