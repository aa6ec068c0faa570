use crate::{codec, error::EncodingError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Signed transaction payload as submitted by the client
///
/// Field names follow the gateway's JSON wire format so the payload can be
/// forwarded untouched. `data` is base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTransaction {
    pub nonce: u64,
    pub value: String,
    pub receiver: String,
    pub sender: String,
    pub gas_price: u64,
    pub gas_limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<u32>,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_signature: Option<String>,
}

impl BatchTransaction {
    /// Compute the transaction hash the network will assign
    ///
    /// This identifier is the only key used to route network observations
    /// back to a batch. Fails when an address or encoded field of the payload
    /// cannot be decoded.
    pub fn hash(&self) -> Result<String, EncodingError> {
        codec::transaction_hash(self)
    }
}

/// Status of a single batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Success,
    Invalid,
    Dropped,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ItemStatus::Pending)
    }
}

/// Status of a whole batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Invalid,
    Dropped,
    Success,
}

/// Transaction payload together with its correlation hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTransaction {
    pub payload: BatchTransaction,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub transaction: ItemTransaction,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Item {
    pub fn new(payload: BatchTransaction) -> Result<Self, EncodingError> {
        let hash = payload.hash()?;
        Ok(Self {
            transaction: ItemTransaction { payload, hash },
            status: ItemStatus::Pending,
            error: None,
        })
    }

    pub fn hash(&self) -> &str {
        &self.transaction.hash
    }
}

/// Ordered list of items executed together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub items: Vec<Item>,
}

impl Group {
    /// A group succeeds once every one of its items is `success`
    pub fn is_successful(&self) -> bool {
        self.items.iter().all(|item| item.status == ItemStatus::Success)
    }

    pub fn invalid_hashes(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Invalid)
            .map(|item| item.hash().to_string())
            .collect()
    }
}

/// Client-submitted batch of ordered transaction groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub groups: Vec<Group>,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
}

impl Batch {
    /// Sender shared by every item of the batch
    pub fn address(&self) -> Option<&str> {
        self.groups
            .first()
            .and_then(|group| group.items.first())
            .map(|item| item.transaction.payload.sender.as_str())
    }

    /// Position of the item with the given hash as `(group, item)`
    pub fn locate(&self, hash: &str) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(group_index, group)| {
            group
                .items
                .iter()
                .position(|item| item.hash() == hash)
                .map(|item_index| (group_index, item_index))
        })
    }
}

/// Batch description as posted by clients: groups as nested arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub id: String,
    pub transactions: Vec<Vec<BatchTransaction>>,
}

impl BatchRequest {
    /// Convert into a pending batch with every item hash computed
    pub fn into_batch(self, source_ip: Option<String>) -> Result<Batch, EncodingError> {
        let groups = self
            .transactions
            .into_iter()
            .map(|group| {
                let items = group.into_iter().map(Item::new).collect::<Result<_, _>>()?;
                Ok(Group { items })
            })
            .collect::<Result<_, EncodingError>>()?;

        Ok(Batch {
            id: self.id,
            groups,
            status: BatchStatus::Pending,
            source_ip,
        })
    }
}

/// Secondary index entry routing a submitted hash back to its batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationEntry {
    pub batch_id: String,
    pub address: String,
    pub submitted_at: DateTime<Utc>,
}

impl CorrelationEntry {
    /// Encode as `<batchId>;<address>;<ISO8601 timestamp>`
    pub fn encode(&self) -> String {
        format!(
            "{};{};{}",
            self.batch_id,
            self.address,
            self.submitted_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        )
    }

    /// Decode a stored value, tolerating missing trailing fields
    ///
    /// A missing address decodes as empty; a missing or unparsable timestamp
    /// decodes as 2021-01-01, which makes the entry immediately eligible for
    /// the dropped-transaction sweep.
    pub fn decode(value: &str) -> Self {
        let mut parts = value.splitn(3, ';');
        let batch_id = parts.next().unwrap_or_default().to_string();
        let address = parts.next().unwrap_or_default().to_string();
        let submitted_at = parts
            .next()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|date| date.with_timezone(&Utc))
            .unwrap_or_else(Self::fallback_timestamp);

        Self {
            batch_id,
            address,
            submitted_at,
        }
    }

    fn fallback_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Execution status reported by the network for an observed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservedStatus {
    Success,
    Fail,
    Invalid,
    #[serde(other)]
    Pending,
}

impl ObservedStatus {
    /// Terminal item status for a final observation, `None` while still pending
    pub fn as_item_status(self) -> Option<ItemStatus> {
        match self {
            ObservedStatus::Success => Some(ItemStatus::Success),
            ObservedStatus::Fail | ObservedStatus::Invalid => Some(ItemStatus::Invalid),
            ObservedStatus::Pending => None,
        }
    }
}

/// Transaction as reported by a shard block or a hash lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTransaction {
    pub hash: String,
    pub sender: String,
    pub receiver: String,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub data: Option<String>,
    pub status: ObservedStatus,
}
