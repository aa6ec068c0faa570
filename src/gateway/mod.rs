//! Network Gateway Module
//!
//! This module defines what the batch engine needs from the blockchain
//! network and provides an HTTP client for it:
//! - Submitting signed transactions
//! - Reading the transactions of each shard block, by nonce
//! - Looking a transaction up by hash

mod client;

#[cfg(test)]
pub mod mock;

pub use client::HttpGateway;

use crate::{BatchTransaction, ObservedTransaction, error::GatewayError};
use async_trait::async_trait;

/// Port for the blockchain network
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Submit a signed transaction.
    ///
    /// Returns the hash assigned by the network, or `GatewayError::Rejected`
    /// with the network's message when the transaction is refused.
    async fn send_transaction(&self, tx: &BatchTransaction) -> Result<String, GatewayError>;

    /// Nonce of the latest block produced by a shard.
    async fn latest_nonce(&self, shard: u32) -> Result<u64, GatewayError>;

    /// Transactions included in the shard block with the given nonce.
    async fn block_transactions(
        &self,
        shard: u32,
        nonce: u64,
    ) -> Result<Vec<ObservedTransaction>, GatewayError>;

    /// Canonical lookup by hash, bypassing the shard streams.
    async fn transaction(&self, hash: &str) -> Result<Option<ObservedTransaction>, GatewayError>;
}
