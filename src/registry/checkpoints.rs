use crate::{error::CacheError, state::SharedCache};
use std::sync::Arc;
use std::time::Duration;

/// Last processed block nonce per shard, so watching resumes after restarts
#[derive(Clone)]
pub struct ShardCheckpoints {
    cache: Arc<dyn SharedCache>,
    ttl: Option<Duration>,
}

impl ShardCheckpoints {
    pub fn new(cache: Arc<dyn SharedCache>, ttl: Option<Duration>) -> Self {
        Self { cache, ttl }
    }

    pub fn key(shard: u32) -> String {
        format!("shardnonce:{}", shard)
    }

    pub async fn get(&self, shard: u32) -> Result<Option<u64>, CacheError> {
        match self.cache.get(&Self::key(shard)).await? {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| CacheError::Serialization(format!("shard nonce '{}': {}", value, e))),
            None => Ok(None),
        }
    }

    pub async fn set(&self, shard: u32, nonce: u64) -> Result<(), CacheError> {
        self.cache
            .set(&Self::key(shard), &nonce.to_string(), self.ttl)
            .await
    }
}
