// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::ConfigFile;
use crate::config::settings::{resolve_folders, FolderSettings};
use crate::errors::{Result, WatchfolderError};

/// Load a configuration file from a given path and return the raw
/// [`ConfigFile`].
///
/// This only performs TOML deserialization; use [`load_and_validate`] to also
/// resolve folders (which compiles patterns and catches bad values).
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and resolve every enabled folder.
///
/// This is the recommended entry point for the rest of the application:
/// a returned snapshot is known-good (regexes compile, paths are non-empty,
/// at least one folder is configured).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Vec<FolderSettings>> {
    let raw = load_from_path(&path)?;

    if raw.folders.is_empty() {
        return Err(WatchfolderError::ConfigError(
            "config must contain at least one [[folder]] section".to_string(),
        ));
    }

    let folders = resolve_folders(&raw)?;
    if folders.is_empty() {
        return Err(WatchfolderError::ConfigError(
            "all configured folders are disabled".to_string(),
        ));
    }

    Ok(folders)
}
