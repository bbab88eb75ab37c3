// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawConfigFile, SystemConfig};
use crate::errors::Result;
use crate::task::DiscovererRegistry;

/// Name of the config file looked up in the home directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** resolve readers
/// or validate lanes. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and resolve it into a [`SystemConfig`].
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Resolves `reader` names against `registry` and source paths against
///   `home`.
/// - Checks lane names, lane settings and the lane timeout.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    home: &Path,
    registry: &DiscovererRegistry,
) -> Result<SystemConfig> {
    let raw_config = load_from_path(&path)?;
    SystemConfig::resolve(raw_config, home, registry)
}

/// `config.toml` inside `home`.
pub fn config_path_in(home: &Path) -> std::path::PathBuf {
    home.join(CONFIG_FILE_NAME)
}
