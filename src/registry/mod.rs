//! Registry Module
//!
//! Typed stores layered over the shared cache:
//! - `BatchStore`: full batch records keyed by `(address, batchId)`
//! - `CorrelationIndex`: submitted hash to batch routing entries
//! - `ShardCheckpoints`: last processed block nonce per shard

mod batches;
mod checkpoints;
mod correlation;

pub use batches::BatchStore;
pub use checkpoints::ShardCheckpoints;
pub use correlation::CorrelationIndex;
