use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Name of the event emitted whenever items of a batch change status
pub const BATCH_UPDATED_EVENT: &str = "onBatchUpdated";

/// Payload of the `onBatchUpdated` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdated {
    pub address: String,
    pub batch_id: String,
    pub tx_hashes: Vec<String>,
}

/// Outbound event sink
///
/// `publish` never blocks and never fails from the caller's point of view.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: BatchUpdated);
}

/// Publisher fanning events out over a broadcast channel
///
/// Subscribers that lag behind lose the oldest events; with no subscriber
/// at all the event is simply discarded.
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<BatchUpdated>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchUpdated> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, event: BatchUpdated) {
        info!(
            "Emitting {} for batch '{}' of address '{}' with hashes {:?}",
            BATCH_UPDATED_EVENT, event.batch_id, event.address, event.tx_hashes
        );

        if self.sender.send(event).is_err() {
            debug!("No subscriber for {}", BATCH_UPDATED_EVENT);
        }
    }
}
