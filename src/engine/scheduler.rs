// src/engine/scheduler.rs

//! Process-wide calendar ticker.
//!
//! One background task broadcasts minute/hour/day ticks to every folder
//! engine. Intervals are fixed-period, starting one full period after
//! process start; the per-folder gating (idle queue + cooldown) lives in the
//! folder engine.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

use crate::config::model::Trigger;

/// A calendar tick delivered to every folder engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Minute,
    Hour,
    Day,
}

impl Tick {
    pub fn trigger(self) -> Trigger {
        match self {
            Tick::Minute => Trigger::Minute,
            Tick::Hour => Trigger::Hour,
            Tick::Day => Trigger::Day,
        }
    }
}

/// Spawn the ticker task and return the broadcast handle folder engines
/// subscribe to.
pub fn spawn_ticker() -> broadcast::Sender<Tick> {
    let (tx, _) = broadcast::channel(16);
    let sender = tx.clone();

    tokio::spawn(async move {
        let start = Instant::now();
        let mut minute = tick_interval(start, Duration::from_secs(60));
        let mut hour = tick_interval(start, Duration::from_secs(60 * 60));
        let mut day = tick_interval(start, Duration::from_secs(60 * 60 * 24));

        loop {
            let tick = tokio::select! {
                _ = minute.tick() => Tick::Minute,
                _ = hour.tick() => Tick::Hour,
                _ = day.tick() => Tick::Day,
            };
            trace!(?tick, "calendar tick");
            // A send error only means no engine is subscribed right now
            // (e.g. mid-reload); the ticker itself outlives rebuilds.
            let _ = sender.send(tick);
        }
    });

    tx
}

fn tick_interval(start: Instant, period: Duration) -> tokio::time::Interval {
    let mut interval = interval_at(start + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
