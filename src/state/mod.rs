//! Shared State Module
//!
//! This module provides the narrow shared-cache contract the batch engine is
//! built on (get / set-with-TTL / delete / prefix scan), two backends for it,
//! and the distributed lease lock used to serialize sweeps across instances.

mod cache;
mod lock;
mod sqlite;

#[cfg(test)]
pub mod mock;

pub use cache::{MemoryCache, SharedCache};
pub use lock::LeaseLock;
pub use sqlite::SqliteCache;
