//! Cache wrappers for testing failure paths.

use super::{MemoryCache, SharedCache};
use crate::error::CacheError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Memory cache that fails reads and writes of keys under a prefix
///
/// Deletes always go through, so cleanup paths can be observed while the
/// main operation fails.
#[derive(Default)]
pub struct FailingCache {
    pub inner: MemoryCache,
    pub failing_prefix: Mutex<Option<String>>,
    pub failing_writes: Mutex<Option<String>>,
}

impl FailingCache {
    pub fn fail_on(&self, prefix: &str) {
        *self.failing_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    /// Fail only writes under `prefix`; reads keep working
    pub fn fail_writes_on(&self, prefix: &str) {
        *self.failing_writes.lock().unwrap() = Some(prefix.to_string());
    }

    fn check(&self, key: &str) -> Result<(), CacheError> {
        Self::matches(&self.failing_prefix, key)
    }

    fn check_write(&self, key: &str) -> Result<(), CacheError> {
        self.check(key)?;
        Self::matches(&self.failing_writes, key)
    }

    fn matches(prefix: &Mutex<Option<String>>, key: &str) -> Result<(), CacheError> {
        match prefix.lock().unwrap().as_deref() {
            Some(prefix) if key.starts_with(prefix) => {
                Err(CacheError::Backend(format!("injected failure for {}", key)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SharedCache for FailingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        for key in keys {
            self.check(key)?;
        }
        self.inner.get_many(keys).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.check_write(key)?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.check_write(key)?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, CacheError> {
        self.inner.delete_if_equals(key, value).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.inner.keys(prefix).await
    }
}
