// src/engine/folder.rs

//! Per-folder engine: composes filter, debounce buffer, task builder and
//! dispatch queue, and owns the folder's lifecycle.
//!
//! The engine is a single Tokio task selecting over raw filesystem events,
//! the debounce deadline, calendar ticks and the shutdown signal. Buffer and
//! deadline are owned exclusively by this task, so there is exactly one
//! logical writer and no locking.

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecursiveMode;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::model::Trigger;
use crate::config::settings::FolderSettings;
use crate::effects::{Notification, Notifier};
use crate::engine::queue::DispatchQueue;
use crate::engine::scheduler::Tick;
use crate::engine::task::{build_synthetic_task, build_tasks_for_flush};
use crate::exec::ActionRunner;
use crate::watch::debounce::DebounceBuffer;
use crate::watch::watcher::{spawn_fs_watcher, WatchSubscription};

/// Handle to one running folder engine.
///
/// `shutdown` closes the watch subscription, discards pending debounce state
/// and waits for the dispatch queue to drain.
#[derive(Debug)]
pub struct FolderHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl FolderHandle {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

/// Start watching one folder.
///
/// Registers the native filesystem subscription and spawns the engine loop.
/// If the subscription cannot be established (missing path, permissions),
/// the failure is logged with an attention notification and `None` is
/// returned: the folder stays dark while the process keeps running for the
/// other folders.
pub fn spawn_folder(
    settings: Arc<FolderSettings>,
    runner: Arc<dyn ActionRunner>,
    notifier: Arc<dyn Notifier>,
    ticks: broadcast::Receiver<Tick>,
    first_startup: bool,
) -> Option<FolderHandle> {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<PathBuf>();

    let subscription = match spawn_fs_watcher(&settings.path, raw_tx, RecursiveMode::Recursive) {
        Ok(sub) => sub,
        Err(err) => {
            error!(
                folder = %settings.path.display(),
                error = %err,
                "failed to setup filesystem watcher; folder stays inert"
            );
            notifier.notify(Notification {
                title: "Folder Action Error".to_string(),
                message: format!(
                    "Failed to setup filesystem watcher: {}: {err}",
                    settings.path.display()
                ),
                icon: None,
                attention: true,
            });
            return None;
        }
    };

    Some(spawn_folder_loop(
        settings,
        runner,
        raw_rx,
        ticks,
        first_startup,
        Some(subscription),
    ))
}

/// Spawn the engine loop with an externally supplied raw event source.
///
/// `spawn_folder` wires this to a real filesystem subscription; tests feed
/// synthetic paths through `raw_rx` directly.
pub fn spawn_folder_loop(
    settings: Arc<FolderSettings>,
    runner: Arc<dyn ActionRunner>,
    raw_rx: mpsc::UnboundedReceiver<PathBuf>,
    ticks: broadcast::Receiver<Tick>,
    first_startup: bool,
    subscription: Option<WatchSubscription>,
) -> FolderHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let join = tokio::spawn(run_loop(
        settings,
        runner,
        raw_rx,
        ticks,
        first_startup,
        subscription,
        shutdown_rx,
    ));

    FolderHandle {
        shutdown: Some(shutdown_tx),
        join,
    }
}

async fn run_loop(
    settings: Arc<FolderSettings>,
    runner: Arc<dyn ActionRunner>,
    mut raw_rx: mpsc::UnboundedReceiver<PathBuf>,
    mut ticks: broadcast::Receiver<Tick>,
    first_startup: bool,
    subscription: Option<WatchSubscription>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    info!(folder = %settings.path.display(), "folder engine watching");

    let queue = DispatchQueue::new(settings.concurrency, runner);
    let mut buffer = DebounceBuffer::new(settings.debounce);
    let mut last_change: Option<Instant> = None;
    let mut raw_open = true;

    // One-time startup action, only on the process's first startup (config
    // reload rebuilds skip it).
    if first_startup {
        if let Some(task) = build_synthetic_task(&settings, Trigger::Startup) {
            debug!(folder = %settings.path.display(), "submitting startup action");
            queue.submit(task);
        }
    }

    loop {
        tokio::select! {
            maybe = raw_rx.recv(), if raw_open => {
                match maybe {
                    Some(path) => {
                        if settings.filter.accept(&path) {
                            debug!(
                                folder = %settings.path.display(),
                                path = %path.display(),
                                "raw fs event"
                            );
                            buffer.observe(path);
                        }
                    }
                    None => raw_open = false,
                }
            }

            _ = tokio::time::sleep_until(
                buffer.deadline().unwrap_or_else(Instant::now)
            ), if buffer.is_armed() => {
                let changed = buffer.take();
                last_change = Some(Instant::now());
                debug!(
                    folder = %settings.path.display(),
                    changed = changed.len(),
                    "debounce window elapsed; flushing"
                );
                for task in build_tasks_for_flush(&settings, changed).await {
                    queue.submit(task);
                }
            }

            tick = ticks.recv() => {
                match tick {
                    Ok(tick) => handle_tick(&settings, &queue, last_change, tick),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(
                            folder = %settings.path.display(),
                            skipped,
                            "lagged behind calendar ticks"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            _ = &mut shutdown_rx => break,
        }
    }

    // Shutdown: close the subscription first so no further events arrive,
    // drop pending debounce state, then wait out in-flight actions.
    drop(subscription);
    buffer.take();
    queue.drain().await;
    info!(folder = %settings.path.display(), "folder engine stopped");
}

/// Scheduled-trigger gate: never overlap change-driven work, never fire
/// mid-burst.
fn handle_tick(
    settings: &FolderSettings,
    queue: &DispatchQueue,
    last_change: Option<Instant>,
    tick: Tick,
) {
    let trigger = tick.trigger();
    if !settings.actions.contains_key(&trigger) {
        return;
    }
    if !queue.idle() {
        debug!(
            folder = %settings.path.display(),
            trigger = %trigger,
            "queue busy; skipping scheduled action"
        );
        return;
    }
    if let Some(at) = last_change {
        if at.elapsed() < settings.cooldown {
            debug!(
                folder = %settings.path.display(),
                trigger = %trigger,
                "within cooldown; skipping scheduled action"
            );
            return;
        }
    }
    if let Some(task) = build_synthetic_task(settings, trigger) {
        debug!(
            folder = %settings.path.display(),
            trigger = %trigger,
            "submitting scheduled action"
        );
        queue.submit(task);
    }
}
