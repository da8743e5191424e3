// src/engine/mod.rs

//! Per-folder engine and process-wide orchestration.
//!
//! The pipeline per watched folder:
//! raw fs event → path filter → debounce buffer → (deadline fires) →
//! task builder → dispatch queue → process executor → outcome →
//! optional notification/sound.
//!
//! - [`task`] materializes flushed paths into self-contained tasks.
//! - [`queue`] is the bounded-concurrency dispatch pipeline.
//! - [`scheduler`] broadcasts minute/hour/day ticks.
//! - [`folder`] is the per-folder select loop and lifecycle.
//! - [`supervisor`] wires all folders, Ctrl-C and config reload.

pub mod folder;
pub mod queue;
pub mod scheduler;
pub mod supervisor;
pub mod task;

pub use folder::{spawn_folder, spawn_folder_loop, FolderHandle};
pub use queue::DispatchQueue;
pub use scheduler::{spawn_ticker, Tick};
pub use supervisor::{apply_reload, build_folders, run_supervisor};
pub use task::{build_synthetic_task, build_task, build_tasks_for_flush, Task};
