// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing_subscriber::{fmt, EnvFilter};

use watchfolder::config::model::Trigger;
use watchfolder::config::settings::{FolderSettings, ResolvedAction};
use watchfolder::effects::{Notification, Notifier};
use watchfolder::engine::task::Task;
use watchfolder::exec::ActionRunner;
use watchfolder::watch::filter::PathFilter;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - Enable levels with e.g. `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Poll `cond` every 10ms until it holds or `timeout` elapses.
pub async fn wait_for(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A `ResolvedAction` that runs `exec` under `/bin/sh` with a 5s timeout.
pub fn action(exec: &str) -> ResolvedAction {
    ResolvedAction {
        exec: exec.to_string(),
        success_match: None,
        error_match: None,
        notify: None,
        sound: None,
        icon: None,
        shell: "/bin/sh".to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// Folder settings with a short debounce, no cooldown and the given triggers
/// all mapped to a trivial action.
pub fn folder_settings(root: &Path, triggers: &[Trigger]) -> FolderSettings {
    FolderSettings {
        path: root.to_path_buf(),
        filter: PathFilter::accept_all(),
        debounce: Duration::from_millis(50),
        concurrency: 1,
        cooldown: Duration::ZERO,
        salt: "salt".to_string(),
        env: std::env::vars().collect::<BTreeMap<_, _>>(),
        actions: triggers.iter().map(|t| (*t, action("true"))).collect(),
    }
}

/// A fake runner that records every task and lets tests shape execution
/// time: `hold` sleeps for a fixed duration, `gate` blocks until the test
/// adds a semaphore permit.
pub struct RecordingRunner {
    pub tasks: Arc<Mutex<Vec<Task>>>,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
    pub hold: Option<Duration>,
    pub gate: Option<Arc<Semaphore>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
            hold: None,
            gate: None,
        }
    }

    pub fn with_hold(hold: Duration) -> Self {
        Self {
            hold: Some(hold),
            ..Self::new()
        }
    }

    pub fn with_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.tasks.lock().unwrap().iter().map(|t| t.trigger).collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl ActionRunner for RecordingRunner {
    fn run(&self, task: Task) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        let tasks = Arc::clone(&self.tasks);
        let active = Arc::clone(&self.active);
        let max_active = Arc::clone(&self.max_active);
        let completed = Arc::clone(&self.completed);
        let hold = self.hold;
        let gate = self.gate.clone();

        Box::pin(async move {
            tasks.lock().unwrap().push(task);
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now, Ordering::SeqCst);

            if let Some(hold) = hold {
                tokio::time::sleep(hold).await;
            }
            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            active.fetch_sub(1, Ordering::SeqCst);
            completed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// A fake notifier that records notifications and sound requests.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notes: Arc<Mutex<Vec<Notification>>>,
    pub sounds: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, note: Notification) {
        self.notes.lock().unwrap().push(note);
    }

    fn play_sound(&self, source: &str) {
        self.sounds.lock().unwrap().push(source.to_string());
    }
}
