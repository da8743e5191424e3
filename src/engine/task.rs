// src/engine/task.rs

//! Materialization of flushed paths into executable tasks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::config::model::Trigger;
use crate::config::settings::{FolderSettings, ResolvedAction};

/// Length of the `[hash]` and `[random]` substitution variables.
const TOKEN_LEN: usize = 16;

static NON_URLSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]+").unwrap());

/// One unit of work for the dispatch queue.
///
/// A task is fully self-contained: it carries the resolved action, the
/// contextual substitution variables, and the spawn options. It holds no
/// back-reference to the debounce buffer and is discarded after execution.
#[derive(Debug, Clone)]
pub struct Task {
    pub trigger: Trigger,
    /// Absolute changed path (the folder root for synthetic tasks).
    pub path: PathBuf,
    /// Path relative to the folder root ("" for synthetic tasks).
    pub file: String,
    pub filename: String,
    /// Basename with every run of non-word characters (other than `-` and
    /// `.`) replaced by a single underscore.
    pub filename_urlsafe: String,
    pub dirname: String,
    /// Short deterministic hash of `path + salt`.
    pub hash: String,
    /// Fresh random token, unique per task.
    pub random: String,
    pub action: ResolvedAction,
    /// Working directory for the child (the folder root).
    pub cwd: PathBuf,
    /// Merged environment for the child (copied per spawn).
    pub env: BTreeMap<String, String>,
}

impl Task {
    /// Substitution variables exposed to script, notify and other templates.
    pub fn vars(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("action", self.trigger.as_str()),
            ("file", &self.file),
            ("filename", &self.filename),
            ("filename_urlsafe", &self.filename_urlsafe),
            ("dirname", &self.dirname),
            ("hash", &self.hash),
            ("random", &self.random),
            ("path", self.path.to_str().unwrap_or_default()),
        ]
    }

    pub fn timeout(&self) -> Duration {
        self.action.timeout
    }
}

/// Build a task for one concrete path, or `None` when the folder has no
/// action configured for the trigger.
pub fn build_task(
    settings: &FolderSettings,
    trigger: Trigger,
    path: PathBuf,
) -> Option<Task> {
    let action = settings.actions.get(&trigger)?.clone();

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = path
        .strip_prefix(&settings.path)
        .map(|rel| rel.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dirname = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    Some(Task {
        trigger,
        filename_urlsafe: urlsafe(&filename),
        hash: salted_hash(&path, &settings.salt),
        random: random_token(),
        filename,
        file,
        dirname,
        path,
        action,
        cwd: settings.path.clone(),
        env: settings.env.clone(),
    })
}

/// Build a synthetic task (startup or scheduled) with the folder root as its
/// path.
pub fn build_synthetic_task(settings: &FolderSettings, trigger: Trigger) -> Option<Task> {
    build_task(settings, trigger, settings.path.clone())
}

/// Classify every path in a flush set and materialize tasks.
///
/// Existence decides the trigger: a path the filesystem still reports is
/// `changed`, a gone one is `deleted`. Paths whose trigger has no configured
/// action are skipped silently.
pub async fn build_tasks_for_flush(
    settings: &FolderSettings,
    changed: impl IntoIterator<Item = PathBuf>,
) -> Vec<Task> {
    let mut tasks = Vec::new();
    for path in changed {
        let trigger = match tokio::fs::metadata(&path).await {
            Ok(_) => Trigger::Changed,
            Err(_) => Trigger::Deleted,
        };
        match build_task(settings, trigger, path) {
            Some(task) => tasks.push(task),
            None => {
                debug!(
                    folder = %settings.path.display(),
                    trigger = %trigger,
                    "no action configured for trigger; dropping change"
                );
            }
        }
    }
    tasks
}

fn urlsafe(filename: &str) -> String {
    NON_URLSAFE.replace_all(filename, "_").into_owned()
}

fn salted_hash(path: &Path, salt: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(salt.as_bytes());
    hasher.finalize().to_hex()[..TOKEN_LEN].to_string()
}

fn random_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::config::settings::ResolvedAction;
    use crate::watch::filter::PathFilter;

    pub(crate) fn test_settings(root: &Path, triggers: &[Trigger]) -> FolderSettings {
        let action = ResolvedAction {
            exec: "true".to_string(),
            success_match: None,
            error_match: None,
            notify: None,
            sound: None,
            icon: None,
            shell: "/bin/sh".to_string(),
            timeout: Duration::from_secs(5),
        };
        FolderSettings {
            path: root.to_path_buf(),
            filter: PathFilter::accept_all(),
            debounce: Duration::from_millis(50),
            concurrency: 1,
            cooldown: Duration::from_secs(0),
            salt: "salt".to_string(),
            env: BTreeMap::new(),
            actions: triggers.iter().map(|t| (*t, action.clone())).collect(),
        }
    }

    #[test]
    fn contextual_fields_are_derived_from_the_path() {
        let settings = test_settings(Path::new("/watched"), &[Trigger::Changed]);
        let task =
            build_task(&settings, Trigger::Changed, PathBuf::from("/watched/sub/a b!.txt"))
                .unwrap();

        assert_eq!(task.file, "sub/a b!.txt");
        assert_eq!(task.filename, "a b!.txt");
        assert_eq!(task.filename_urlsafe, "a_b_.txt");
        assert_eq!(task.dirname, "/watched/sub");
        assert_eq!(task.hash.len(), TOKEN_LEN);
        assert_eq!(task.random.len(), TOKEN_LEN);
    }

    #[test]
    fn hash_is_deterministic_and_salted() {
        let p = Path::new("/watched/a.txt");
        assert_eq!(salted_hash(p, "s"), salted_hash(p, "s"));
        assert_ne!(salted_hash(p, "s"), salted_hash(p, "other"));
    }

    #[test]
    fn random_tokens_differ_per_task() {
        assert_ne!(random_token(), random_token());
    }

    #[test]
    fn missing_action_yields_no_task() {
        let settings = test_settings(Path::new("/watched"), &[Trigger::Changed]);
        assert!(build_task(&settings, Trigger::Deleted, PathBuf::from("/watched/x")).is_none());
    }

    #[test]
    fn synthetic_task_uses_the_root() {
        let settings = test_settings(Path::new("/watched"), &[Trigger::Hour]);
        let task = build_synthetic_task(&settings, Trigger::Hour).unwrap();
        assert_eq!(task.path, PathBuf::from("/watched"));
        assert_eq!(task.file, "");
    }

    #[tokio::test]
    async fn flush_classifies_existing_vs_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("here.txt");
        std::fs::write(&existing, "x").unwrap();
        let gone = dir.path().join("gone.txt");

        let settings =
            test_settings(dir.path(), &[Trigger::Changed, Trigger::Deleted]);
        let tasks =
            build_tasks_for_flush(&settings, vec![existing.clone(), gone.clone()]).await;

        assert_eq!(tasks.len(), 2);
        let by_path = |p: &Path| tasks.iter().find(|t| t.path == p).unwrap();
        assert_eq!(by_path(&existing).trigger, Trigger::Changed);
        assert_eq!(by_path(&gone).trigger, Trigger::Deleted);
    }

    #[tokio::test]
    async fn deletion_without_deleted_action_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.txt");

        let settings = test_settings(dir.path(), &[Trigger::Changed]);
        let tasks = build_tasks_for_flush(&settings, vec![gone]).await;
        assert!(tasks.is_empty());
    }

    proptest! {
        #[test]
        fn urlsafe_output_only_contains_safe_chars(name in "[ -~]{0,64}") {
            let safe = urlsafe(&name);
            prop_assert!(safe
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'));
        }
    }
}
