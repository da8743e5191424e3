// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [defaults]
/// debounce_ms = 250
/// timeout = 30
///
/// [[folder]]
/// path = "/home/me/Dropbox/Inbox"
///
/// [folder.actions.changed]
/// exec = "cp [path] /backup/[filename_urlsafe]"
/// ```
///
/// All sections are optional and have reasonable defaults, except that at
/// least one `[[folder]]` entry must exist.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Process-wide defaults from `[defaults]`.
    #[serde(default)]
    pub defaults: DefaultsSection,

    /// All watched folders from `[[folder]]`.
    #[serde(default, rename = "folder")]
    pub folders: Vec<FolderConfig>,
}

/// `[defaults]` section: fallback values applied to every folder that does
/// not override them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultsSection {
    /// Quiet window after the last raw event before changes are flushed.
    #[serde(default)]
    pub debounce_ms: Option<u64>,

    /// Regex a changed file's basename must match (default: match all).
    #[serde(default)]
    pub filename_match: Option<String>,

    /// Regex that excludes a basename when it matches (default: match none).
    #[serde(default)]
    pub filename_exclude: Option<String>,

    /// Regex a changed file's full path must match (default: match all).
    #[serde(default)]
    pub path_match: Option<String>,

    /// Regex that excludes a full path when it matches (default: match none).
    #[serde(default)]
    pub path_exclude: Option<String>,

    /// Max actions in flight per folder.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Per-action timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Shell interpreter the action scripts are piped into.
    #[serde(default)]
    pub shell: Option<String>,

    /// Minimum seconds since the last real change before a scheduled
    /// (minute/hour/day) action may fire.
    #[serde(default)]
    pub cooldown: Option<u64>,

    /// Salt mixed into the `[hash]` substitution variable.
    #[serde(default)]
    pub salt_string: Option<String>,

    /// Environment overlay applied on top of the process environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// One `[[folder]]` entry.
///
/// Every optional field falls back to the `[defaults]` section, then to the
/// built-in default (see `settings`).
#[derive(Debug, Clone, Deserialize)]
pub struct FolderConfig {
    /// Root path of the watched tree.
    pub path: String,

    /// Disabled folders are skipped entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub debounce_ms: Option<u64>,

    #[serde(default)]
    pub filename_match: Option<String>,

    #[serde(default)]
    pub filename_exclude: Option<String>,

    #[serde(default)]
    pub path_match: Option<String>,

    #[serde(default)]
    pub path_exclude: Option<String>,

    #[serde(default)]
    pub concurrency: Option<usize>,

    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default)]
    pub cooldown: Option<u64>,

    #[serde(default)]
    pub salt_string: Option<String>,

    /// Folder-local environment overlay, merged on top of `[defaults].env`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Actions keyed by trigger. A trigger with no entry here never fires
    /// for this folder.
    #[serde(default)]
    pub actions: BTreeMap<Trigger, ActionSpec>,
}

fn default_true() -> bool {
    true
}

/// The named reason a task is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// One-time action at process start (not on config reload).
    Startup,
    /// A watched file or directory exists after the debounce flush.
    Changed,
    /// A watched file or directory is gone after the debounce flush.
    Deleted,
    /// Scheduled: every minute.
    Minute,
    /// Scheduled: every hour.
    Hour,
    /// Scheduled: every day.
    Day,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Changed => "changed",
            Trigger::Deleted => "deleted",
            Trigger::Minute => "minute",
            Trigger::Hour => "hour",
            Trigger::Day => "day",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[folder.actions.<trigger>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSpec {
    /// Shell script to run. Either a single string or a list of lines that
    /// are joined with newlines before execution.
    pub exec: ScriptLines,

    /// If set, the captured output must match this regex for the action to
    /// count as successful.
    #[serde(default)]
    pub success_match: Option<String>,

    /// If set, the action fails when the captured output matches this regex.
    #[serde(default)]
    pub error_match: Option<String>,

    /// Desktop notification template shown on success.
    #[serde(default)]
    pub notify: Option<String>,

    /// Sound file played on success.
    #[serde(default)]
    pub sound: Option<String>,

    /// Icon used for the success notification.
    #[serde(default)]
    pub icon: Option<String>,

    /// Per-action shell override.
    #[serde(default)]
    pub shell: Option<String>,

    /// Per-action timeout override (seconds).
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// An action's script body: a bare string or a list of lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptLines {
    One(String),
    Many(Vec<String>),
}

impl ScriptLines {
    /// Join the lines into the script body handed to the shell.
    pub fn joined(&self) -> String {
        match self {
            ScriptLines::One(s) => s.clone(),
            ScriptLines::Many(lines) => lines.join("\n"),
        }
    }
}
