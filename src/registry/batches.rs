use crate::{Batch, error::CacheError, state::SharedCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Store of full batch records
///
/// Records are keyed by `batch:<address>:<batchId>` and expire with the
/// configured TTL; nothing deletes them explicitly. Writes are plain
/// overwrites: two concurrent read-modify-write cycles on the same batch
/// resolve as last writer wins.
#[derive(Clone)]
pub struct BatchStore {
    cache: Arc<dyn SharedCache>,
    ttl: Option<Duration>,
}

impl BatchStore {
    pub fn new(cache: Arc<dyn SharedCache>, ttl: Option<Duration>) -> Self {
        Self { cache, ttl }
    }

    pub fn key(address: &str, batch_id: &str) -> String {
        format!("batch:{}:{}", address, batch_id)
    }

    pub async fn get(&self, address: &str, batch_id: &str) -> Result<Option<Batch>, CacheError> {
        match self.cache.get(&Self::key(address, batch_id)).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, address: &str, batch: &Batch) -> Result<(), CacheError> {
        let value = serde_json::to_string(batch)?;
        self.cache
            .set(&Self::key(address, &batch.id), &value, self.ttl)
            .await
    }

    /// Every live batch of an address; undecodable records are skipped
    pub async fn list(&self, address: &str) -> Result<Vec<Batch>, CacheError> {
        let keys = self.cache.keys(&Self::key(address, "")).await?;
        let values = self.cache.get_many(&keys).await?;

        let mut batches = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(value) = value else { continue };
            match serde_json::from_str(&value) {
                Ok(batch) => batches.push(batch),
                Err(e) => warn!("Skipping undecodable batch record '{}': {}", key, e),
            }
        }
        Ok(batches)
    }
}
