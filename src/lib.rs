//! This crate implements a batched, cross-shard transaction submission and
//! reconciliation engine. Clients submit batches of ordered transaction
//! groups; the engine submits them group by group, watches the shards for
//! their outcomes, reaps transactions that never land and notifies consumers.

pub mod types; // Batch, group, item and observed transaction types.
pub mod codec; // Network transaction encoding and hashing.
pub mod error; // Error taxonomy shared by every component.
pub mod config; // Defines and loads system configuration.
pub mod state; // Shared cache contract, its backends and the lease lock.
pub mod registry; // Typed stores: batches, correlation index, shard checkpoints.
pub mod gateway; // Client for the blockchain network.
pub mod validation; // Checks run on a batch before anything is submitted.
pub mod batch; // Submission and reconciliation of batches.
pub mod scheduler; // Shard watcher and dropped-transaction reaper loops.
pub mod notify; // Outbound batch update events.
pub mod extract; // Metadata decoders for transaction data fields.
pub mod api; // HTTP surface.

#[cfg(test)]
mod test_support;

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use batch::BatchOrchestrator;
