//! Batch Orchestrator Module
//!
//! Entry point of the batch engine. Accepts a client batch, submits its
//! first group to the network and persists it; later groups are started by
//! reconciliation once the previous group has fully succeeded.
//!
//! # Submission Flow
//! 1. Validate the request (shape, duplicate, common sender, payloads)
//! 2. Compute every item hash and mark batch and items `pending`
//! 3. Submit the first group, item by item, stopping at the first rejection,
//!    and index each accepted hash in the correlation index right away
//! 4. Persist the batch, unless the first group already failed

use crate::{
    Batch, BatchRequest, BatchStatus, CorrelationEntry, ItemStatus,
    error::Result,
    gateway::Gateway,
    notify::Publisher,
    registry::{BatchStore, CorrelationIndex},
    validation::Validator,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Batch orchestrator
///
/// Owns the write paths of batch records: submission, group starts and
/// reconciliation (see `reconcile.rs`).
pub struct BatchOrchestrator {
    pub(super) gateway: Arc<dyn Gateway>,
    pub(super) batches: BatchStore,
    pub(super) correlation: CorrelationIndex,
    pub(super) publisher: Arc<dyn Publisher>,
    validator: Validator,
}

impl BatchOrchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        batches: BatchStore,
        correlation: CorrelationIndex,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            gateway,
            validator: Validator::new(batches.clone()),
            batches,
            correlation,
            publisher,
        }
    }

    /// Accept a new batch and start its first group
    ///
    /// Validation failures are returned as errors before anything is sent.
    /// Rejections by the network are not errors: they are recorded on the
    /// item and the returned batch is marked `invalid`. Such a batch is never
    /// persisted.
    pub async fn submit_batch(&self, request: BatchRequest, source_ip: Option<String>) -> Result<Batch> {
        let address = self.validator.validate(&request).await?;
        let mut batch = request.into_batch(source_ip)?;

        info!(
            "Starting initial transactions for batch '{}' of address '{}'",
            batch.id, address
        );
        self.start_group(&mut batch, 0).await;

        if !batch.groups[0].invalid_hashes().is_empty() {
            warn!(
                "First group of batch '{}' failed, batch will not be tracked",
                batch.id
            );
            batch.status = BatchStatus::Invalid;
            return Ok(batch);
        }

        self.batches.put(&address, &batch).await?;
        Ok(batch)
    }

    /// Submit the items of one group in order
    ///
    /// Stops at the first rejected item; items after it are never sent and
    /// stay `pending`. Every accepted item is indexed as soon as the network
    /// accepts it. Safe to call for any group of the batch.
    ///
    /// Once a transaction is on the network its outcome has to be recorded,
    /// so a failed index write is logged and submission goes on. Such an
    /// item stays `pending` until the batch record expires.
    pub async fn start_group(&self, batch: &mut Batch, group_index: usize) {
        let Some(address) = batch.address().map(str::to_string) else {
            return;
        };
        let batch_id = batch.id.clone();
        let source_ip = batch.source_ip.clone().unwrap_or_default();
        let Some(group) = batch.groups.get_mut(group_index) else {
            return;
        };

        let entry = CorrelationEntry {
            batch_id: batch_id.clone(),
            address,
            submitted_at: Utc::now(),
        };
        let mut accepted = Vec::new();
        for item in group.items.iter_mut() {
            info!(
                "For batch '{}', sending transaction with nonce {} from source ip '{}'",
                batch_id, item.transaction.payload.nonce, source_ip
            );

            match self.gateway.send_transaction(&item.transaction.payload).await {
                Ok(hash) => {
                    if hash != item.transaction.hash {
                        warn!(
                            "Network assigned hash '{}' instead of computed '{}'",
                            hash, item.transaction.hash
                        );
                        item.transaction.hash = hash;
                    }
                    if let Err(e) = self.correlation.insert(&item.transaction.hash, &entry).await {
                        error!(
                            "For batch '{}', failed to index transaction '{}': {}",
                            batch_id, item.transaction.hash, e
                        );
                    }
                    accepted.push(item.transaction.hash.clone());
                }
                Err(e) => {
                    item.status = ItemStatus::Invalid;
                    item.error = e.rejection_message().map(str::to_string);
                    error!(
                        "For batch '{}', error when executing transaction '{}': {}",
                        batch_id, item.transaction.hash, e
                    );
                    break;
                }
            }
        }

        info!(
            "For batch '{}', started transactions with hashes {:?}",
            batch_id, accepted
        );
    }

    pub async fn get_batch(&self, address: &str, batch_id: &str) -> Result<Option<Batch>> {
        Ok(self.batches.get(address, batch_id).await?)
    }

    pub async fn list_batches(&self, address: &str) -> Result<Vec<Batch>> {
        Ok(self.batches.list(address).await?)
    }
}
