// src/engine/queue.rs

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::warn;

use crate::engine::task::Task;
use crate::exec::ActionRunner;

/// Bounded-concurrency dispatch pipeline for one folder.
///
/// Intake is a FIFO unbounded channel: `submit` never blocks and backpressure
/// is purely queue depth, which is fine at human-scale change volume. A
/// single intake loop pulls tasks in submission order and acquires one of
/// `concurrency` semaphore permits before handing each task to the runner in
/// its own Tokio task. With the default `concurrency = 1`, actions execute
/// strictly one at a time in submission order.
///
/// `pending` counts queued plus in-flight tasks through a watch channel so
/// that `idle` is a cheap read and `drain` can await quiescence without
/// polling.
#[derive(Debug)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<Task>,
    pending: watch::Sender<usize>,
}

impl DispatchQueue {
    pub fn new(concurrency: usize, runner: Arc<dyn ActionRunner>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        let (pending_tx, _) = watch::channel(0usize);

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let pending = pending_tx.clone();

        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let runner = Arc::clone(&runner);
                let pending = pending.clone();

                tokio::spawn(async move {
                    runner.run(task).await;
                    drop(permit);
                    pending.send_modify(|n| *n = n.saturating_sub(1));
                });
            }
        });

        Self {
            tx,
            pending: pending_tx,
        }
    }

    /// Enqueue a task. Never blocks.
    pub fn submit(&self, task: Task) {
        self.pending.send_modify(|n| *n += 1);
        if self.tx.send(task).is_err() {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            warn!("dispatch queue worker gone; dropping task");
        }
    }

    /// True when no tasks are queued or in flight.
    pub fn idle(&self) -> bool {
        *self.pending.borrow() == 0
    }

    /// Wait until every queued and in-flight task has completed.
    pub async fn drain(&self) {
        let mut rx = self.pending.subscribe();
        loop {
            if *rx.borrow_and_update() == 0 {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
