// src/config/settings.rs

//! Resolution of raw config entries into runnable per-folder settings.
//!
//! A [`FolderSettings`] is an immutable snapshot: once a folder engine is
//! built from it, nothing mutates it. Config reload builds fresh snapshots
//! and replaces whole engines instead of patching running ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::config::model::{ActionSpec, ConfigFile, FolderConfig, Trigger};
use crate::errors::{Result, WatchfolderError};
use crate::watch::filter::PathFilter;

pub const DEFAULT_DEBOUNCE_MS: u64 = 250;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHELL: &str = "/bin/bash";
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// An [`ActionSpec`] with its patterns compiled and its overrides applied.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    /// Script body (lines already joined), before substitution.
    pub exec: String,
    pub success_match: Option<Regex>,
    pub error_match: Option<Regex>,
    pub notify: Option<String>,
    pub sound: Option<String>,
    pub icon: Option<String>,
    /// Effective shell for this action (action override or folder shell).
    pub shell: String,
    /// Effective timeout for this action.
    pub timeout: Duration,
}

/// Fully resolved configuration for one watched folder.
#[derive(Debug, Clone)]
pub struct FolderSettings {
    /// Normalized root path; no trailing separator, canonicalized when the
    /// path exists at startup.
    pub path: PathBuf,
    pub filter: PathFilter,
    pub debounce: Duration,
    pub concurrency: usize,
    pub cooldown: Duration,
    pub salt: String,
    /// Merged environment handed to every child process:
    /// process env < `[defaults].env` < folder `env`.
    pub env: BTreeMap<String, String>,
    pub actions: BTreeMap<Trigger, ResolvedAction>,
}

impl FolderSettings {
    /// Resolve one raw folder entry against the `[defaults]` section.
    pub fn resolve(cfg: &ConfigFile, folder: &FolderConfig) -> Result<Self> {
        let d = &cfg.defaults;

        let path = normalize_root(&folder.path)?;

        let filter = PathFilter::compile(
            pick(&folder.filename_match, &d.filename_match),
            pick(&folder.filename_exclude, &d.filename_exclude),
            pick(&folder.path_match, &d.path_match),
            pick(&folder.path_exclude, &d.path_exclude),
        )?;

        let shell = folder
            .shell
            .clone()
            .or_else(|| d.shell.clone())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        let timeout = Duration::from_secs(
            folder.timeout.or(d.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let mut env: BTreeMap<String, String> = std::env::vars().collect();
        env.extend(d.env.clone());
        env.extend(folder.env.clone());

        let mut actions = BTreeMap::new();
        for (trigger, spec) in &folder.actions {
            actions.insert(
                *trigger,
                resolve_action(spec, &shell, timeout)
                    .map_err(|e| annotate(e, *trigger, &folder.path))?,
            );
        }

        Ok(Self {
            path,
            filter,
            debounce: Duration::from_millis(
                folder
                    .debounce_ms
                    .or(d.debounce_ms)
                    .unwrap_or(DEFAULT_DEBOUNCE_MS),
            ),
            concurrency: folder
                .concurrency
                .or(d.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY)
                .max(1),
            cooldown: Duration::from_secs(
                folder.cooldown.or(d.cooldown).unwrap_or(DEFAULT_COOLDOWN_SECS),
            ),
            salt: folder
                .salt_string
                .clone()
                .or_else(|| d.salt_string.clone())
                .unwrap_or_default(),
            env,
            actions,
        })
    }
}

/// Resolve every enabled folder in the config.
pub fn resolve_folders(cfg: &ConfigFile) -> Result<Vec<FolderSettings>> {
    let mut out = Vec::new();
    for folder in &cfg.folders {
        if !folder.enabled {
            continue;
        }
        out.push(FolderSettings::resolve(cfg, folder)?);
    }
    Ok(out)
}

fn resolve_action(
    spec: &ActionSpec,
    folder_shell: &str,
    folder_timeout: Duration,
) -> Result<ResolvedAction> {
    let success_match = spec
        .success_match
        .as_deref()
        .map(Regex::new)
        .transpose()?;
    let error_match = spec.error_match.as_deref().map(Regex::new).transpose()?;

    Ok(ResolvedAction {
        exec: spec.exec.joined(),
        success_match,
        error_match,
        notify: spec.notify.clone(),
        sound: spec.sound.clone(),
        icon: spec.icon.clone(),
        shell: spec
            .shell
            .clone()
            .unwrap_or_else(|| folder_shell.to_string()),
        timeout: spec
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(folder_timeout),
    })
}

/// Strip trailing separators and canonicalize when possible.
///
/// A missing path is not an error here: the watch subscription will fail at
/// engine start and the folder degrades to a dark state, which keeps the
/// process alive for the other folders.
fn normalize_root(raw: &str) -> Result<PathBuf> {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(WatchfolderError::ConfigError(format!(
            "folder path must not be empty (got {raw:?})"
        )));
    }
    let path = PathBuf::from(trimmed);
    Ok(std::fs::canonicalize(&path).unwrap_or(path))
}

fn pick<'a>(local: &'a Option<String>, default: &'a Option<String>) -> Option<&'a str> {
    local.as_deref().or(default.as_deref())
}

fn annotate(err: WatchfolderError, trigger: Trigger, path: &str) -> WatchfolderError {
    WatchfolderError::ConfigError(format!(
        "action '{trigger}' of folder {path:?}: {err}"
    ))
}
