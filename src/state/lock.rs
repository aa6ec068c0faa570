use super::SharedCache;
use crate::error::CacheError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

static LEASE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Named lock shared by every instance using the same cache
///
/// The lock is a lease: a cache entry written with a TTL slightly longer than
/// the guarded work. A crashed holder therefore blocks others for at most one
/// lease duration.
#[derive(Clone)]
pub struct LeaseLock {
    cache: Arc<dyn SharedCache>,
    key: String,
    ttl: Duration,
}

impl LeaseLock {
    pub fn new(cache: Arc<dyn SharedCache>, name: &str, ttl: Duration) -> Self {
        Self {
            cache,
            key: format!("lock:{}", name),
            ttl,
        }
    }

    /// Run `work` while holding the lease
    ///
    /// Returns `Ok(None)` without running `work` when another holder owns the
    /// lease. The lease is released once `work` completes, whatever its
    /// output; a failed release is logged and left to the TTL.
    pub async fn run<F, Fut, T>(&self, work: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let token = Self::token();
        if !self.cache.set_if_absent(&self.key, &token, self.ttl).await? {
            debug!("Lease '{}' is held elsewhere, skipping", self.key);
            return Ok(None);
        }

        let output = work().await;

        match self.cache.delete_if_equals(&self.key, &token).await {
            Ok(true) => {}
            Ok(false) => warn!("Lease '{}' expired before release", self.key),
            Err(e) => warn!("Failed to release lease '{}': {}", self.key, e),
        }

        Ok(Some(output))
    }

    fn token() -> String {
        format!(
            "{}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            LEASE_COUNTER.fetch_add(1, Ordering::Relaxed)
        )
    }
}
