//! Mock gateway for testing.

use super::Gateway;
use crate::{BatchTransaction, ObservedStatus, ObservedTransaction, error::GatewayError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Scriptable in-memory network
///
/// Submissions are recorded in order; payloads whose hash is listed in
/// `rejections` are refused with the given message. Payloads listed in
/// `assigned` are acknowledged with the given hash instead of their own.
#[derive(Default)]
pub struct MockGateway {
    pub submitted: Mutex<Vec<String>>,
    pub rejections: Mutex<HashMap<String, String>>,
    pub assigned: Mutex<HashMap<String, String>>,
    pub latest: Mutex<HashMap<u32, u64>>,
    pub blocks: Mutex<HashMap<(u32, u64), Vec<ObservedTransaction>>>,
    pub known: Mutex<HashMap<String, ObservedTransaction>>,
    pub fail_lookups: Mutex<bool>,
}

impl MockGateway {
    pub fn reject(&self, tx: &BatchTransaction, message: &str) {
        self.rejections
            .lock()
            .unwrap()
            .insert(tx.hash().unwrap(), message.to_string());
    }

    /// Acknowledge `tx` with `hash` rather than the hash of its payload
    pub fn assign_hash(&self, tx: &BatchTransaction, hash: &str) {
        self.assigned
            .lock()
            .unwrap()
            .insert(tx.hash().unwrap(), hash.to_string());
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Append a block holding the given transactions and make it the latest
    pub fn push_block(&self, shard: u32, nonce: u64, transactions: Vec<ObservedTransaction>) {
        self.blocks
            .lock()
            .unwrap()
            .insert((shard, nonce), transactions);
        let mut latest = self.latest.lock().unwrap();
        let current = latest.entry(shard).or_insert(nonce);
        *current = (*current).max(nonce);
    }

    pub fn set_latest(&self, shard: u32, nonce: u64) {
        self.latest.lock().unwrap().insert(shard, nonce);
    }

    /// Make a transaction visible to the canonical hash lookup
    pub fn know(&self, transaction: ObservedTransaction) {
        self.known
            .lock()
            .unwrap()
            .insert(transaction.hash.clone(), transaction);
    }

    pub fn observed(tx: &BatchTransaction, status: ObservedStatus) -> ObservedTransaction {
        ObservedTransaction {
            hash: tx.hash().unwrap(),
            sender: tx.sender.clone(),
            receiver: tx.receiver.clone(),
            nonce: tx.nonce,
            data: tx.data.clone(),
            status,
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send_transaction(&self, tx: &BatchTransaction) -> Result<String, GatewayError> {
        let hash = tx.hash().map_err(|e| GatewayError::Rejected {
            message: e.to_string(),
        })?;
        if let Some(message) = self.rejections.lock().unwrap().get(&hash) {
            return Err(GatewayError::Rejected {
                message: message.clone(),
            });
        }

        let hash = self.assigned.lock().unwrap().get(&hash).cloned().unwrap_or(hash);
        self.submitted.lock().unwrap().push(hash.clone());
        Ok(hash)
    }

    async fn latest_nonce(&self, shard: u32) -> Result<u64, GatewayError> {
        Ok(self.latest.lock().unwrap().get(&shard).copied().unwrap_or(0))
    }

    async fn block_transactions(
        &self,
        shard: u32,
        nonce: u64,
    ) -> Result<Vec<ObservedTransaction>, GatewayError> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&(shard, nonce))
            .cloned()
            .unwrap_or_default())
    }

    async fn transaction(&self, hash: &str) -> Result<Option<ObservedTransaction>, GatewayError> {
        if *self.fail_lookups.lock().unwrap() {
            return Err(GatewayError::Transport("lookup unavailable".to_string()));
        }
        Ok(self.known.lock().unwrap().get(hash).cloned())
    }
}
