//! Dropped-Transaction Reaper
//!
//! Coarse sweep over every live correlation entry. Entries older than the
//! drop threshold are checked against the canonical hash lookup: a final
//! transaction found there was missed by the watcher and is reconciled
//! normally, a transaction not found at all is marked `dropped`.
//!
//! The sweep runs under a lease lock so only one instance sweeps at a time.

use super::watcher::{Updates, publish_updates};
use crate::{
    ItemStatus,
    batch::BatchOrchestrator,
    config::ReaperConfig,
    error::Result,
    gateway::Gateway,
    notify::Publisher,
    registry::CorrelationIndex,
    state::LeaseLock,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct DroppedReaper {
    gateway: Arc<dyn Gateway>,
    orchestrator: Arc<BatchOrchestrator>,
    correlation: CorrelationIndex,
    lock: LeaseLock,
    publisher: Arc<dyn Publisher>,
    drop_threshold: Duration,
}

impl DroppedReaper {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        orchestrator: Arc<BatchOrchestrator>,
        correlation: CorrelationIndex,
        lock: LeaseLock,
        publisher: Arc<dyn Publisher>,
        config: &ReaperConfig,
    ) -> Self {
        Self {
            gateway,
            orchestrator,
            correlation,
            lock,
            publisher,
            drop_threshold: config.drop_threshold(),
        }
    }

    pub async fn sweep(&self) -> Option<usize> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the current time were `now`
    ///
    /// Returns the number of items changed, or `None` when the lease is held
    /// elsewhere or the sweep failed.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Option<usize> {
        match self.lock.run(|| self.reap(now)).await {
            Ok(Some(Ok(changed))) => Some(changed),
            Ok(Some(Err(e))) => {
                error!("Error sweeping dropped transactions: {}", e);
                None
            }
            Ok(None) => None,
            Err(e) => {
                error!("Could not acquire reaper lease: {}", e);
                None
            }
        }
    }

    async fn reap(&self, now: DateTime<Utc>) -> Result<usize> {
        let entries = self.correlation.all().await?;
        debug!("Checking {} pending transactions for drops", entries.len());

        let mut updates = Updates::new();
        let mut changed = 0;

        for (hash, entry) in entries {
            if now - entry.submitted_at < self.drop_threshold {
                continue;
            }

            let status = match self.gateway.transaction(&hash).await {
                Ok(Some(transaction)) => match transaction.status.as_item_status() {
                    Some(status) => status,
                    None => {
                        debug!("Transaction '{}' found but not final yet", hash);
                        continue;
                    }
                },
                Ok(None) => {
                    info!(
                        "Transaction '{}' of batch '{}' not found, marking as dropped",
                        hash, entry.batch_id
                    );
                    ItemStatus::Dropped
                }
                Err(e) => {
                    warn!("Lookup of transaction '{}' failed, retrying next sweep: {}", hash, e);
                    continue;
                }
            };

            let Ok(outcome) = self
                .orchestrator
                .reconcile(&hash, &entry.batch_id, &entry.address, status)
                .await
            else {
                continue;
            };

            if outcome.changed() {
                changed += 1;
                updates
                    .entry((entry.address, entry.batch_id))
                    .or_default()
                    .push(hash);
            }
        }

        publish_updates(self.publisher.as_ref(), updates);
        Ok(changed)
    }
}
