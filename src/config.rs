//! Configuration Module
//!
//! This module defines all configuration structures for the batch engine.
//! Configuration is loaded from TOML files and parsed using serde. Every
//! section is optional and falls back to its defaults.

use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [api]
/// host = "127.0.0.1"
/// port = 3001
///
/// [gateway]
/// url = "https://devnet-gateway.multiversx.com"
///
/// [watcher]
/// interval_ms = 1000
/// max_look_behind = 100
///
/// [reaper]
/// drop_threshold_secs = 600
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    pub watcher: WatcherConfig,
    pub reaper: ReaperConfig,
    pub ttl: TtlConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Network gateway configuration
///
/// # Fields
/// - `url`: Base URL of the gateway HTTP API
/// - `shards`: Shard identifiers watched for new transactions (metachain included)
/// - `request_timeout_ms`: Per-request timeout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: String,
    pub shards: Vec<u32>,
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8079".to_string(),
            shards: vec![0, 1, 2, 4_294_967_295],
            request_timeout_ms: 10_000,
        }
    }
}

/// Shared cache configuration
///
/// `url` is either `memory` for the in-process cache or an sqlx SQLite URL
/// (e.g. `sqlite://batches.db`, `sqlite::memory:`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tx-batcher.db".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }
}

/// Shard transaction watcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Maximum number of block nonces a shard may lag behind before skipping ahead
    pub max_look_behind: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1_000,
            max_look_behind: 100,
        }
    }
}

impl WatcherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Dropped-transaction reaper configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub drop_threshold_secs: u64,
    /// Lease duration of the distributed sweep lock
    pub lock_ttl_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 60_000,
            drop_threshold_secs: 600,
            lock_ttl_secs: 90,
        }
    }
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn drop_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.drop_threshold_secs as i64)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

/// Time-to-live settings of the shared cache entries
///
/// A zero value means the entry never expires.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub correlation_secs: u64,
    pub batch_secs: u64,
    pub checkpoint_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            correlation_secs: 900,
            batch_secs: 4 * 60 * 60,
            checkpoint_secs: 0,
        }
    }
}

impl TtlConfig {
    pub fn correlation(&self) -> Option<Duration> {
        to_ttl(self.correlation_secs)
    }

    pub fn batch(&self) -> Option<Duration> {
        to_ttl(self.batch_secs)
    }

    pub fn checkpoint(&self) -> Option<Duration> {
        to_ttl(self.checkpoint_secs)
    }
}

fn to_ttl(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        // Read the file contents as a string
        let content = fs::read_to_string(path)?;

        // Parse the TOML into our Config structure
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }
}
