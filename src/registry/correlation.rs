use crate::{CorrelationEntry, error::CacheError, state::SharedCache};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const PREFIX: &str = "pendingtransaction:";

/// Index from a submitted transaction hash to its batch
///
/// An entry lives from the moment the network accepts a transaction until
/// the item reaches a terminal status. The TTL bounds leaked entries.
#[derive(Clone)]
pub struct CorrelationIndex {
    cache: Arc<dyn SharedCache>,
    ttl: Option<Duration>,
}

impl CorrelationIndex {
    pub fn new(cache: Arc<dyn SharedCache>, ttl: Option<Duration>) -> Self {
        Self { cache, ttl }
    }

    pub fn key(hash: &str) -> String {
        format!("{}{}", PREFIX, hash)
    }

    pub async fn insert(&self, hash: &str, entry: &CorrelationEntry) -> Result<(), CacheError> {
        self.cache
            .set(&Self::key(hash), &entry.encode(), self.ttl)
            .await
    }

    pub async fn get(&self, hash: &str) -> Result<Option<CorrelationEntry>, CacheError> {
        let value = self.cache.get(&Self::key(hash)).await?;
        Ok(value.map(|value| CorrelationEntry::decode(&value)))
    }

    /// Look up many hashes with a single multi-get; misses are left out
    pub async fn get_many(
        &self,
        hashes: &[String],
    ) -> Result<HashMap<String, CorrelationEntry>, CacheError> {
        let keys: Vec<String> = hashes.iter().map(|hash| Self::key(hash)).collect();
        let values = self.cache.get_many(&keys).await?;

        Ok(hashes
            .iter()
            .zip(values)
            .filter_map(|(hash, value)| {
                value.map(|value| (hash.clone(), CorrelationEntry::decode(&value)))
            })
            .collect())
    }

    /// Every live entry, as `(hash, entry)` pairs
    pub async fn all(&self) -> Result<Vec<(String, CorrelationEntry)>, CacheError> {
        let keys = self.cache.keys(PREFIX).await?;
        let values = self.cache.get_many(&keys).await?;

        Ok(keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| {
                let hash = key.strip_prefix(PREFIX)?.to_string();
                value.map(|value| (hash, CorrelationEntry::decode(&value)))
            })
            .collect())
    }

    pub async fn remove(&self, hash: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::key(hash)).await
    }
}
