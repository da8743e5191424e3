// src/watch/debounce.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

/// Accumulates distinct changed paths during a quiet window.
///
/// There is exactly one deadline per buffer: every `observe` re-arms it to
/// `now + window`, so a continuous burst of events produces a single flush
/// only after the stream has been quiet for the full window. The owning
/// folder engine selects on [`DebounceBuffer::deadline`] and calls
/// [`DebounceBuffer::take`] when it fires.
///
/// Paths are deduped by set membership; observing the same path twice within
/// a window is one logical change. A `BTreeSet` keeps flush enumeration
/// deterministic.
#[derive(Debug)]
pub struct DebounceBuffer {
    window: Duration,
    paths: BTreeSet<PathBuf>,
    deadline: Option<Instant>,
}

impl DebounceBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            paths: BTreeSet::new(),
            deadline: None,
        }
    }

    /// Record a changed path and restart the quiet-window deadline.
    pub fn observe(&mut self, path: PathBuf) {
        self.paths.insert(path);
        self.deadline = Some(Instant::now() + self.window);
    }

    /// The instant the current window elapses, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Return and clear all observed paths, disarming the deadline.
    pub fn take(&mut self) -> BTreeSet<PathBuf> {
        self.deadline = None;
        std::mem::take(&mut self.paths)
    }
}
