//! Shard Transaction Watcher
//!
//! Polls every shard for blocks finalized since its checkpoint, matches the
//! transactions they contain against the correlation index and reconciles
//! every hit into its batch.
//!
//! # Tick
//! 1. Per shard, pick the nonce range: `checkpoint + 1 ..= latest`, bounded
//!    by `max_look_behind`; without a checkpoint only the latest block is read
//! 2. Per block, look up all transaction hashes with one multi-get
//! 3. Reconcile every hit whose observed status is final
//! 4. Persist the block nonce as the new checkpoint
//! 5. Publish one event per batch touched during the tick

use crate::{
    ObservedTransaction,
    batch::BatchOrchestrator,
    config::WatcherConfig,
    error::Result,
    extract,
    gateway::Gateway,
    notify::{BatchUpdated, Publisher},
    registry::{CorrelationIndex, ShardCheckpoints},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// Hashes changed during one pass, keyed by `(address, batch_id)`
pub(super) type Updates = BTreeMap<(String, String), Vec<String>>;

pub(super) fn publish_updates(publisher: &dyn Publisher, updates: Updates) {
    for ((address, batch_id), tx_hashes) in updates {
        publisher.publish(BatchUpdated {
            address,
            batch_id,
            tx_hashes,
        });
    }
}

/// Marks a tick as running until dropped
pub struct TickGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

pub struct ShardWatcher {
    gateway: Arc<dyn Gateway>,
    orchestrator: Arc<BatchOrchestrator>,
    correlation: CorrelationIndex,
    checkpoints: ShardCheckpoints,
    publisher: Arc<dyn Publisher>,
    shards: Vec<u32>,
    max_look_behind: u64,
    running: AtomicBool,
}

impl ShardWatcher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        orchestrator: Arc<BatchOrchestrator>,
        correlation: CorrelationIndex,
        checkpoints: ShardCheckpoints,
        publisher: Arc<dyn Publisher>,
        shards: Vec<u32>,
        config: &WatcherConfig,
    ) -> Self {
        Self {
            gateway,
            orchestrator,
            correlation,
            checkpoints,
            publisher,
            shards,
            max_look_behind: config.max_look_behind,
            running: AtomicBool::new(false),
        }
    }

    /// Claim the running flag; `None` while another tick holds it
    pub fn try_begin(&self) -> Option<TickGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard {
                running: &self.running,
            })
    }

    /// Run one tick unless the previous one is still in progress
    ///
    /// Returns `false` when the tick was skipped. Errors never escape: a
    /// failing shard is logged and retried from its checkpoint next tick.
    pub async fn tick(&self) -> bool {
        let Some(_guard) = self.try_begin() else {
            debug!("Previous watcher tick still running, skipping");
            return false;
        };

        let mut updates = Updates::new();
        for &shard in &self.shards {
            if let Err(e) = self.watch_shard(shard, &mut updates).await {
                error!("Error watching shard {}: {}", shard, e);
            }
        }

        publish_updates(self.publisher.as_ref(), updates);
        true
    }

    /// First nonce to read for a shard, `None` when it is up to date
    async fn start_nonce(&self, shard: u32, latest: u64) -> Result<Option<u64>> {
        let start = match self.checkpoints.get(shard).await? {
            None => latest,
            Some(last) => (last + 1).max(latest.saturating_sub(self.max_look_behind)),
        };
        Ok((start <= latest).then_some(start))
    }

    async fn watch_shard(&self, shard: u32, updates: &mut Updates) -> Result<()> {
        let latest = self.gateway.latest_nonce(shard).await?;
        let Some(start) = self.start_nonce(shard, latest).await? else {
            return Ok(());
        };

        debug!("Shard {}: processing blocks {}..={}", shard, start, latest);
        for nonce in start..=latest {
            let transactions = self.gateway.block_transactions(shard, nonce).await?;
            self.process_block(&transactions, updates).await?;
            self.checkpoints.set(shard, nonce).await?;
        }

        Ok(())
    }

    async fn process_block(
        &self,
        transactions: &[ObservedTransaction],
        updates: &mut Updates,
    ) -> Result<()> {
        if transactions.is_empty() {
            return Ok(());
        }

        let hashes: Vec<String> = transactions.iter().map(|tx| tx.hash.clone()).collect();
        let hits = self.correlation.get_many(&hashes).await?;

        for transaction in transactions {
            let Some(entry) = hits.get(&transaction.hash) else {
                continue;
            };
            let Some(status) = transaction.status.as_item_status() else {
                debug!("Transaction '{}' not final yet", transaction.hash);
                continue;
            };

            if let Some(extracted) = extract::extract(transaction) {
                info!(
                    "Transaction '{}' of batch '{}' carries {:?}",
                    transaction.hash, entry.batch_id, extracted
                );
            }

            // Reconciliation logs its own failures; the block still counts as processed
            let Ok(outcome) = self
                .orchestrator
                .reconcile(&transaction.hash, &entry.batch_id, &entry.address, status)
                .await
            else {
                continue;
            };

            if outcome.changed() {
                updates
                    .entry((entry.address.clone(), entry.batch_id.clone()))
                    .or_default()
                    .push(transaction.hash.clone());
            }
        }

        Ok(())
    }
}
