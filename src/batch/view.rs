use crate::{Batch, BatchStatus, BatchTransaction, ItemStatus};
use serde::{Deserialize, Serialize};

/// Client-facing projection of a batch
///
/// Groups are flattened into one list in execution order. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchView {
    pub id: String,
    pub status: BatchStatus,
    pub transactions: Vec<TransactionView>,
}

/// One batch item as shown to clients: the signed payload plus its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub payload: BatchTransaction,
    pub hash: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Batch> for BatchView {
    fn from(batch: &Batch) -> Self {
        let transactions = batch
            .groups
            .iter()
            .flat_map(|group| group.items.iter())
            .map(|item| {
                // An invalid batch never resumes, so its pending items are shown as invalid
                let status = if batch.status == BatchStatus::Invalid
                    && item.status == ItemStatus::Pending
                {
                    ItemStatus::Invalid
                } else {
                    item.status
                };

                TransactionView {
                    payload: item.transaction.payload.clone(),
                    hash: item.transaction.hash.clone(),
                    status,
                    error: item.error.clone(),
                }
            })
            .collect();

        Self {
            id: batch.id.clone(),
            status: batch.status,
            transactions,
        }
    }
}
