use crate::{BatchRequest, BatchTransaction, error::BatchError, registry::BatchStore};
use tracing::{debug, warn};

/// Checks a submitted batch before anything is sent or persisted
pub struct Validator {
    batches: BatchStore,
}

impl Validator {
    pub fn new(batches: BatchStore) -> Self {
        Self { batches }
    }

    /// Validate a batch request
    /// Returns the sender address shared by the batch if valid
    pub async fn validate(&self, request: &BatchRequest) -> Result<String, BatchError> {
        // 1. Shape: at least one group, no empty group
        let address = Self::check_shape(request)?;
        debug!("Validating batch '{}' from {}", request.id, address);

        // 2. Duplicate detection
        self.check_duplicate(request, &address).await?;

        // 3. Every transaction comes from the same sender
        Self::check_senders(request, &address)?;

        // 4. Payload well-formedness
        for tx in request.transactions.iter().flatten() {
            Self::check_payload(tx)?;
        }

        Ok(address)
    }

    fn check_shape(request: &BatchRequest) -> Result<String, BatchError> {
        if request.transactions.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        if let Some(index) = request.transactions.iter().position(|group| group.is_empty()) {
            return Err(BatchError::EmptyGroup { index });
        }

        if request.id.is_empty() || request.id.contains(';') {
            return Err(BatchError::MalformedPayload(format!(
                "invalid batch id '{}'",
                request.id
            )));
        }

        Ok(request.transactions[0][0].sender.clone())
    }

    async fn check_duplicate(&self, request: &BatchRequest, address: &str) -> Result<(), BatchError> {
        if self.batches.get(address, &request.id).await?.is_some() {
            warn!(
                "Duplicate batch detected with id '{}' for address {}",
                request.id, address
            );
            return Err(BatchError::DuplicateBatch {
                id: request.id.clone(),
                address: address.to_string(),
            });
        }
        Ok(())
    }

    fn check_senders(request: &BatchRequest, address: &str) -> Result<(), BatchError> {
        if let Some(tx) = request
            .transactions
            .iter()
            .flatten()
            .find(|tx| tx.sender != address)
        {
            warn!("Sender mismatch in batch '{}': {}", request.id, tx.sender);
            return Err(BatchError::SenderMismatch {
                expected: address.to_string(),
                found: tx.sender.clone(),
            });
        }
        Ok(())
    }

    fn check_payload(tx: &BatchTransaction) -> Result<(), BatchError> {
        let malformed = |reason: &str| {
            Err(BatchError::MalformedPayload(format!(
                "transaction with nonce {}: {}",
                tx.nonce, reason
            )))
        };

        if tx.sender.is_empty() || tx.receiver.is_empty() {
            return malformed("sender and receiver are required");
        }
        if tx.chain_id.is_empty() {
            return malformed("chain id is required");
        }
        if tx.signature.is_empty() {
            return malformed("signature is required");
        }
        // Addresses, value and encoded fields must survive hashing
        if let Err(e) = tx.hash() {
            return malformed(&e.to_string());
        }
        Ok(())
    }
}
