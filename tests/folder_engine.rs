// tests/folder_engine.rs

//! End-to-end tests of the per-folder engine loop with injected raw events.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use watchfolder::config::model::Trigger;
use watchfolder::config::settings::FolderSettings;
use watchfolder::engine::folder::{spawn_folder_loop, FolderHandle};
use watchfolder::engine::scheduler::Tick;
use watchfolder::watch::filter::PathFilter;

use common::{folder_settings, init_tracing, wait_for, RecordingRunner};

struct Harness {
    raw_tx: mpsc::UnboundedSender<PathBuf>,
    #[allow(dead_code)]
    ticks: broadcast::Sender<Tick>,
    runner: Arc<RecordingRunner>,
    handle: FolderHandle,
}

fn start(settings: FolderSettings, runner: RecordingRunner, first_startup: bool) -> Harness {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (ticks, tick_rx) = broadcast::channel(16);
    let runner = Arc::new(runner);

    let handle = spawn_folder_loop(
        Arc::new(settings),
        runner.clone(),
        raw_rx,
        tick_rx,
        first_startup,
        None,
    );

    Harness {
        raw_tx,
        ticks,
        runner,
        handle,
    }
}

#[tokio::test]
async fn burst_collapses_to_one_task() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "x").unwrap();

    let h = start(
        folder_settings(dir.path(), &[Trigger::Changed]),
        RecordingRunner::new(),
        false,
    );

    for _ in 0..5 {
        h.raw_tx.send(file.clone()).unwrap();
    }

    assert!(wait_for(|| h.runner.task_count() == 1, Duration::from_secs(2)).await);
    // Give a would-be second flush time to (incorrectly) appear.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.runner.task_count(), 1);

    let tasks = h.runner.tasks.lock().unwrap().clone();
    assert_eq!(tasks[0].trigger, Trigger::Changed);
    assert_eq!(tasks[0].path, file);
    assert_eq!(tasks[0].filename, "a.txt");
    assert_eq!(tasks[0].file, "a.txt");

    drop(tasks);
    h.handle.shutdown().await;
}

#[tokio::test]
async fn path_filter_drops_non_matching_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("a.txt");
    let log = dir.path().join("a.log");
    std::fs::write(&txt, "x").unwrap();
    std::fs::write(&log, "x").unwrap();

    let mut settings = folder_settings(dir.path(), &[Trigger::Changed]);
    settings.filter =
        PathFilter::compile(None, None, Some(r".+\.txt$"), None).unwrap();

    let h = start(settings, RecordingRunner::new(), false);

    h.raw_tx.send(log.clone()).unwrap();
    h.raw_tx.send(txt.clone()).unwrap();

    assert!(wait_for(|| h.runner.task_count() == 1, Duration::from_secs(2)).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.runner.task_count(), 1);
    assert_eq!(h.runner.tasks.lock().unwrap()[0].path, txt);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn no_dedupe_across_flushes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "x").unwrap();

    let h = start(
        folder_settings(dir.path(), &[Trigger::Changed]),
        RecordingRunner::new(),
        false,
    );

    h.raw_tx.send(file.clone()).unwrap();
    assert!(wait_for(|| h.runner.task_count() == 1, Duration::from_secs(2)).await);

    h.raw_tx.send(file.clone()).unwrap();
    assert!(wait_for(|| h.runner.task_count() == 2, Duration::from_secs(2)).await);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn deleted_paths_use_the_deleted_trigger() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("gone.txt");

    let h = start(
        folder_settings(dir.path(), &[Trigger::Changed, Trigger::Deleted]),
        RecordingRunner::new(),
        false,
    );

    h.raw_tx.send(gone.clone()).unwrap();
    assert!(wait_for(|| h.runner.task_count() == 1, Duration::from_secs(2)).await);
    assert_eq!(h.runner.triggers(), vec![Trigger::Deleted]);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn deletion_without_deleted_action_produces_nothing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("gone.txt");

    let h = start(
        folder_settings(dir.path(), &[Trigger::Changed]),
        RecordingRunner::new(),
        false,
    );

    h.raw_tx.send(gone).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.runner.task_count(), 0);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn startup_action_fires_only_on_first_startup() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let h = start(
        folder_settings(dir.path(), &[Trigger::Startup]),
        RecordingRunner::new(),
        true,
    );
    assert!(wait_for(|| h.runner.task_count() == 1, Duration::from_secs(2)).await);
    let task = h.runner.tasks.lock().unwrap()[0].clone();
    assert_eq!(task.trigger, Trigger::Startup);
    assert_eq!(task.path, dir.path());
    h.handle.shutdown().await;

    // Rebuild (as a config reload would): no startup action this time.
    let h = start(
        folder_settings(dir.path(), &[Trigger::Startup]),
        RecordingRunner::new(),
        false,
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.runner.task_count(), 0);
    h.handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_actions() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "x").unwrap();

    let h = start(
        folder_settings(dir.path(), &[Trigger::Changed]),
        RecordingRunner::with_hold(Duration::from_millis(150)),
        false,
    );

    h.raw_tx.send(file).unwrap();
    assert!(wait_for(|| h.runner.task_count() == 1, Duration::from_secs(2)).await);

    h.handle.shutdown().await;
    assert_eq!(h.runner.completed_count(), 1);
}
