// src/engine/supervisor.rs

//! Process-wide orchestration: builds every folder engine from a config
//! snapshot, owns the calendar ticker, and handles shutdown and hot reload.
//!
//! Reload semantics: a change to the config file triggers a re-load; on
//! success every engine is torn down and rebuilt from the new snapshot (a
//! running engine's configuration is never mutated in place); on failure the
//! error is logged and the last-good snapshot keeps running.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecursiveMode;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::config::loader::load_and_validate;
use crate::config::settings::FolderSettings;
use crate::effects::Notifier;
use crate::engine::folder::{spawn_folder, FolderHandle};
use crate::engine::scheduler::{spawn_ticker, Tick};
use crate::errors::Result;
use crate::exec::{ActionRunner, ShellRunner};
use crate::watch::watcher::spawn_fs_watcher;

/// Quiet window applied to config-file change events before a reload.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlEvent {
    Reload,
    Shutdown,
}

/// Run the daemon until Ctrl-C.
pub async fn run_supervisor(
    config_path: PathBuf,
    initial: Vec<FolderSettings>,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let ticker = spawn_ticker();
    let runner: Arc<dyn ActionRunner> = Arc::new(ShellRunner::new(Arc::clone(&notifier)));

    let (control_tx, mut control_rx) = mpsc::channel::<ControlEvent>(8);

    // Ctrl-C → graceful shutdown.
    {
        let tx = control_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(ControlEvent::Shutdown).await;
        });
    }

    // Config file watch → reload requests. Failure to watch only disables
    // hot reload.
    let _config_sub = match spawn_config_watch(&config_path, control_tx.clone()) {
        Ok(sub) => Some(sub),
        Err(err) => {
            warn!(error = %err, "cannot watch config file; hot reload disabled");
            None
        }
    };

    let mut handles = build_folders(&initial, &runner, &notifier, &ticker, true);

    while let Some(event) = control_rx.recv().await {
        match event {
            ControlEvent::Shutdown => {
                info!("shutdown requested; draining folder engines");
                teardown(handles).await;
                break;
            }
            ControlEvent::Reload => {
                handles =
                    apply_reload(&config_path, handles, &runner, &notifier, &ticker).await;
            }
        }
    }

    info!("supervisor exiting");
    Ok(())
}

/// One reload step: re-read the config and rebuild every engine from the new
/// snapshot, or keep the current engines running when the new config is bad.
pub async fn apply_reload(
    config_path: &Path,
    handles: Vec<FolderHandle>,
    runner: &Arc<dyn ActionRunner>,
    notifier: &Arc<dyn Notifier>,
    ticker: &broadcast::Sender<Tick>,
) -> Vec<FolderHandle> {
    match load_and_validate(config_path) {
        Ok(snapshot) => {
            info!("config reloaded; rebuilding folder engines");
            teardown(handles).await;
            build_folders(&snapshot, runner, notifier, ticker, false)
        }
        Err(err) => {
            error!(
                error = %err,
                "config reload failed; keeping last-good configuration"
            );
            handles
        }
    }
}

/// Spawn one folder engine per resolved folder. Folders whose watch cannot
/// be established are skipped (already logged by `spawn_folder`).
pub fn build_folders(
    snapshot: &[FolderSettings],
    runner: &Arc<dyn ActionRunner>,
    notifier: &Arc<dyn Notifier>,
    ticker: &broadcast::Sender<Tick>,
    first_startup: bool,
) -> Vec<FolderHandle> {
    let mut handles = Vec::new();
    for settings in snapshot {
        info!(folder = %settings.path.display(), "setting up folder watch");
        if let Some(handle) = spawn_folder(
            Arc::new(settings.clone()),
            Arc::clone(runner),
            Arc::clone(notifier),
            ticker.subscribe(),
            first_startup,
        ) {
            handles.push(handle);
        }
    }
    handles
}

async fn teardown(handles: Vec<FolderHandle>) {
    for handle in handles {
        handle.shutdown().await;
    }
}

/// Watch the config file's parent directory (non-recursively, so siblings in
/// a busy directory stay cheap) and forward debounced reload requests for
/// events touching the file itself.
fn spawn_config_watch(
    config_path: &Path,
    control_tx: mpsc::Sender<ControlEvent>,
) -> Result<crate::watch::watcher::WatchSubscription> {
    let config_path = std::fs::canonicalize(config_path)
        .unwrap_or_else(|_| config_path.to_path_buf());
    let parent = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let subscription = spawn_fs_watcher(&parent, raw_tx, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        while let Some(path) = raw_rx.recv().await {
            if path != config_path {
                continue;
            }
            // Editors fire bursts of events per save; settle first, then
            // swallow whatever arrived during the window.
            tokio::time::sleep(RELOAD_DEBOUNCE).await;
            while raw_rx.try_recv().is_ok() {}

            if control_tx.send(ControlEvent::Reload).await.is_err() {
                break;
            }
        }
    });

    Ok(subscription)
}
