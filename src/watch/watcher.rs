// src/watch/watcher.rs

use std::path::Path;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::errors::Result;

/// Handle for one recursive filesystem subscription.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle closes the subscription.
pub struct WatchSubscription {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription").finish()
    }
}

/// Subscribe to `root` (recursion per `mode`) and forward every event path
/// into `raw_tx`.
///
/// The notify callback runs on a foreign thread, so events cross into the
/// async world through an unbounded channel; the folder engine owns the
/// receiving end. Establishment failures (missing path, permissions) are
/// returned to the caller, which degrades that folder without touching the
/// rest of the process.
pub fn spawn_fs_watcher(
    root: &Path,
    raw_tx: UnboundedSender<std::path::PathBuf>,
    mode: RecursiveMode,
) -> Result<WatchSubscription> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in event.paths {
                    if raw_tx.send(path).is_err() {
                        // Engine is gone; nothing left to deliver to.
                        return;
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    watcher.watch(root, mode)?;
    debug!(folder = %root.display(), "filesystem subscription established");

    Ok(WatchSubscription { _inner: watcher })
}
