//! Periodic Reconciliation Module
//!
//! Two independent loops drive batches forward after submission:
//! - ShardWatcher: frequent tick reading new shard blocks; a tick that is
//!   still running when the next one is due makes the next one skip
//! - DroppedReaper: coarse sweep marking long-unseen transactions dropped,
//!   serialized across instances by a lease lock
//!
//! Neither loop ever stops on an error; failures are logged and the next
//! tick proceeds normally.

mod reaper;
mod watcher;

#[cfg(test)]
mod tests;

pub use reaper::DroppedReaper;
pub use watcher::{ShardWatcher, TickGuard};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Spawn the watcher loop
///
/// Every tick runs in its own task so a slow tick cannot delay the schedule;
/// overlapping ticks are skipped by the watcher itself.
pub fn spawn_watcher(watcher: Arc<ShardWatcher>, interval: Duration) -> JoinHandle<()> {
    info!("Shard watcher started with interval {:?}", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let watcher = watcher.clone();
            tokio::spawn(async move {
                watcher.tick().await;
            });
        }
    })
}

/// Spawn the dropped-transaction sweep loop
pub fn spawn_reaper(reaper: Arc<DroppedReaper>, interval: Duration) -> JoinHandle<()> {
    info!("Dropped transaction reaper started with interval {:?}", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Some(changed) = reaper.sweep().await {
                if changed > 0 {
                    info!("Reaper sweep changed {} transactions", changed);
                }
            }
        }
    })
}
