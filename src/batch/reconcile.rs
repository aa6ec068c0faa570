//! Reconciliation of observed outcomes into batch records
//!
//! A terminal status observed for a hash is applied to its item, the batch
//! status is derived from it and, when a group has fully succeeded, the next
//! group is started. The correlation entry of the hash is removed on every
//! exit path, including errors.

use super::BatchOrchestrator;
use crate::{BatchStatus, ItemStatus, error::Result, notify::BatchUpdated};
use tracing::{debug, error, info, warn};

/// Outcome of a single reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The batch record no longer exists
    BatchMissing,
    /// The hash is not part of the batch
    ItemMissing,
    /// The item was already terminal; nothing changed
    Unchanged,
    /// The item moved to a terminal status; holds the resulting batch status
    Applied(BatchStatus),
}

impl Reconciled {
    pub fn changed(self) -> bool {
        matches!(self, Reconciled::Applied(_))
    }
}

impl BatchOrchestrator {
    /// Apply a terminal status observed for `hash`
    ///
    /// Callers are expected to notify about the hash when the outcome is
    /// `Applied`; the only event published here is the cascading failure of
    /// a freshly started group.
    pub async fn reconcile(
        &self,
        hash: &str,
        batch_id: &str,
        address: &str,
        status: ItemStatus,
    ) -> Result<Reconciled> {
        let result = self.apply(hash, batch_id, address, status).await;

        if let Err(e) = self.correlation.remove(hash).await {
            warn!("Could not remove correlation entry for '{}': {}", hash, e);
        }

        if let Err(e) = &result {
            error!(
                "Error reconciling transaction '{}' of batch '{}': {}",
                hash, batch_id, e
            );
        }
        result
    }

    async fn apply(
        &self,
        hash: &str,
        batch_id: &str,
        address: &str,
        status: ItemStatus,
    ) -> Result<Reconciled> {
        let Some(mut batch) = self.batches.get(address, batch_id).await? else {
            warn!(
                "Batch '{}' of address '{}' not found, skipping transaction '{}'",
                batch_id, address, hash
            );
            return Ok(Reconciled::BatchMissing);
        };

        let Some((group_index, item_index)) = batch.locate(hash) else {
            warn!("Transaction '{}' not part of batch '{}'", hash, batch_id);
            return Ok(Reconciled::ItemMissing);
        };

        let item = &mut batch.groups[group_index].items[item_index];
        if item.status.is_terminal() {
            debug!(
                "Transaction '{}' already {:?}, ignoring {:?}",
                hash, item.status, status
            );
            return Ok(Reconciled::Unchanged);
        }
        item.status = status;

        info!(
            "Transaction '{}' of batch '{}' is now {:?}",
            hash, batch_id, status
        );

        if batch.status == BatchStatus::Pending {
            match status {
                ItemStatus::Invalid => batch.status = BatchStatus::Invalid,
                ItemStatus::Dropped => batch.status = BatchStatus::Dropped,
                ItemStatus::Success if batch.groups[group_index].is_successful() => {
                    let next = group_index + 1;
                    if next == batch.groups.len() {
                        info!("Batch '{}' completed successfully", batch_id);
                        batch.status = BatchStatus::Success;
                    } else {
                        info!("Starting group {} of batch '{}'", next, batch_id);
                        self.start_group(&mut batch, next).await;

                        let invalid = batch.groups[next].invalid_hashes();
                        if !invalid.is_empty() {
                            batch.status = BatchStatus::Invalid;
                            self.publisher.publish(BatchUpdated {
                                address: address.to_string(),
                                batch_id: batch_id.to_string(),
                                tx_hashes: invalid,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        self.batches.put(address, &batch).await?;

        Ok(Reconciled::Applied(batch.status))
    }
}
