// src/config/mod.rs

//! Configuration loading and resolution.
//!
//! - [`model`] maps the TOML file one-to-one onto serde structs.
//! - [`settings`] resolves raw folder entries against the `[defaults]`
//!   section into ready-to-run [`settings::FolderSettings`] (paths
//!   normalized, regexes compiled, environment merged).
//! - [`loader`] reads the file and runs both steps.

pub mod loader;
pub mod model;
pub mod settings;

pub use loader::load_and_validate;
pub use model::{ActionSpec, ConfigFile, FolderConfig, ScriptLines, Trigger};
pub use settings::{resolve_folders, FolderSettings, ResolvedAction};
