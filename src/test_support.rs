//! Shared fixtures for unit tests.

use crate::{
    Batch, BatchRequest, BatchTransaction,
    batch::BatchOrchestrator,
    config::{ReaperConfig, WatcherConfig},
    gateway::mock::MockGateway,
    notify::{BatchUpdated, Publisher},
    registry::{BatchStore, CorrelationIndex, ShardCheckpoints},
    scheduler::{DroppedReaper, ShardWatcher},
    state::{LeaseLock, mock::FailingCache},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SHARDS: [u32; 2] = [0, 1];

pub const SENDER: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
pub const RECEIVER: &str = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx";
pub const OTHER: &str = "erd1k2s324ww2g0yj38qn2ch2jwctdy8mnfxep94q9arncc6xecg3xaq6mjse8";

pub fn sample_tx(nonce: u64) -> BatchTransaction {
    BatchTransaction {
        nonce,
        value: "0".to_string(),
        receiver: RECEIVER.to_string(),
        sender: SENDER.to_string(),
        gas_price: 1_000_000_000,
        gas_limit: 50_000,
        data: None,
        chain_id: "D".to_string(),
        version: 1,
        options: None,
        signature: "ab".repeat(64),
        guardian: None,
        guardian_signature: None,
    }
}

pub fn tx_hash(nonce: u64) -> String {
    sample_tx(nonce).hash().unwrap()
}

pub fn sample_batch(id: &str, transactions: Vec<Vec<BatchTransaction>>) -> Batch {
    sample_request(id, transactions).into_batch(None).unwrap()
}

pub fn sample_request(id: &str, transactions: Vec<Vec<BatchTransaction>>) -> BatchRequest {
    BatchRequest {
        id: id.to_string(),
        transactions,
    }
}

/// Publisher keeping every event in memory
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<BatchUpdated>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<BatchUpdated> {
        self.events.lock().unwrap().clone()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, event: BatchUpdated) {
        self.events.lock().unwrap().push(event);
    }
}

/// Engine wired over in-memory collaborators
pub struct Harness {
    pub cache: Arc<FailingCache>,
    pub gateway: Arc<MockGateway>,
    pub publisher: Arc<RecordingPublisher>,
    pub batches: BatchStore,
    pub correlation: CorrelationIndex,
    pub checkpoints: ShardCheckpoints,
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        let cache = Arc::new(FailingCache::default());
        let gateway = Arc::new(MockGateway::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let batches = BatchStore::new(cache.clone(), None);
        let correlation = CorrelationIndex::new(cache.clone(), None);
        let checkpoints = ShardCheckpoints::new(cache.clone(), None);
        let orchestrator = Arc::new(BatchOrchestrator::new(
            gateway.clone(),
            batches.clone(),
            correlation.clone(),
            publisher.clone(),
        ));

        Self {
            cache,
            gateway,
            publisher,
            batches,
            correlation,
            checkpoints,
            orchestrator,
        }
    }

    pub fn watcher(&self) -> ShardWatcher {
        ShardWatcher::new(
            self.gateway.clone(),
            self.orchestrator.clone(),
            self.correlation.clone(),
            self.checkpoints.clone(),
            self.publisher.clone(),
            SHARDS.to_vec(),
            &WatcherConfig::default(),
        )
    }

    pub fn reaper(&self) -> DroppedReaper {
        let config = ReaperConfig::default();
        DroppedReaper::new(
            self.gateway.clone(),
            self.orchestrator.clone(),
            self.correlation.clone(),
            LeaseLock::new(self.cache.clone(), "dropped-reaper", Duration::from_secs(90)),
            self.publisher.clone(),
            &config,
        )
    }

    pub async fn stored(&self, id: &str) -> Option<Batch> {
        self.batches.get(SENDER, id).await.unwrap()
    }
}
