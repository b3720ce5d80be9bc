// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Built-in configuration used when no config file exists.
///
/// Reproduces the conventional `source/` -> `build/` site layout.
pub const BUILTIN_CONFIG: &str = include_str!("builtin.toml");

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown task/pipeline references,
///   - cycles through `after` and pipeline membership,
///   - invalid globs and sanity of global settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate config text that is already in memory.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// The built-in configuration, validated.
pub fn load_builtin() -> Result<ConfigFile> {
    parse_and_validate(BUILTIN_CONFIG)
}

/// Load `path` if it exists; otherwise fall back to [`BUILTIN_CONFIG`] when
/// `allow_builtin` is set (i.e. the user did not name a file explicitly).
pub fn load_or_builtin(path: &Path, allow_builtin: bool) -> Result<ConfigFile> {
    if allow_builtin && !path.exists() {
        info!(path = ?path, "no config file found; using built-in pipeline");
        return load_builtin();
    }
    load_and_validate(path)
}

/// Default config location: `Assetdag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetdag.toml")
}
