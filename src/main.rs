use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tx_batcher::{
    api::Server,
    batch::BatchOrchestrator,
    config::Config,
    gateway::HttpGateway,
    notify::BroadcastPublisher,
    registry::{BatchStore, CorrelationIndex, ShardCheckpoints},
    scheduler::{self, DroppedReaper, ShardWatcher},
    state::{LeaseLock, MemoryCache, SharedCache, SqliteCache},
};

/// The main entry point of the batch engine.
///
/// Initializes logging, loads the configuration, connects the shared cache
/// and the gateway client, starts the watcher and reaper loops in the
/// background and finally serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&path)?;
    info!("Batch engine starting with config: {:?}", config);

    // Shared cache: in process, or SQLite for state surviving restarts
    let cache: Arc<dyn SharedCache> = if config.cache.is_memory() {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(SqliteCache::connect(&config.cache.url).await?)
    };

    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
    let publisher = Arc::new(BroadcastPublisher::default());

    let batches = BatchStore::new(cache.clone(), config.ttl.batch());
    let correlation = CorrelationIndex::new(cache.clone(), config.ttl.correlation());
    let checkpoints = ShardCheckpoints::new(cache.clone(), config.ttl.checkpoint());

    let orchestrator = Arc::new(BatchOrchestrator::new(
        gateway.clone(),
        batches,
        correlation.clone(),
        publisher.clone(),
    ));

    if config.watcher.enabled {
        let watcher = ShardWatcher::new(
            gateway.clone(),
            orchestrator.clone(),
            correlation.clone(),
            checkpoints,
            publisher.clone(),
            config.gateway.shards.clone(),
            &config.watcher,
        );
        scheduler::spawn_watcher(Arc::new(watcher), config.watcher.interval());
    }

    if config.reaper.enabled {
        let lock = LeaseLock::new(cache.clone(), "dropped-reaper", config.reaper.lock_ttl());
        let reaper = DroppedReaper::new(
            gateway.clone(),
            orchestrator.clone(),
            correlation,
            lock,
            publisher.clone(),
            &config.reaper,
        );
        scheduler::spawn_reaper(Arc::new(reaper), config.reaper.interval());
    }

    let server = Server::new(config.api.clone(), orchestrator);
    server.start().await?;

    Ok(())
}
