// src/watch/mod.rs

//! File watching primitives.
//!
//! This module is responsible for:
//! - Evaluating filename/path include+exclude regexes per folder.
//! - Collapsing bursts of raw events into one flush per quiet window.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** know about actions or the dispatch queue; it only turns
//! raw filesystem noise into a settled set of changed paths.

pub mod debounce;
pub mod filter;
pub mod watcher;

pub use debounce::DebounceBuffer;
pub use filter::PathFilter;
pub use watcher::{spawn_fs_watcher, WatchSubscription};
