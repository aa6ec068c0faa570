//! Error types for the batch engine.

use thiserror::Error;

/// Errors raised by the shared cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend storage failure.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised while talking to the network gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The network refused the transaction (signature, nonce, balance, gas).
    #[error("Transaction rejected: {message}")]
    Rejected {
        /// Message decoded from the gateway response.
        message: String,
    },

    /// Transport level failure.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The gateway answered with something we could not decode.
    #[error("Gateway decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Human readable rejection message, when the gateway provided one.
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { message } => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors raised while encoding a transaction for hashing.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("'{0}' is not a valid erd1 address")]
    Address(String),

    #[error("value '{0}' is not a decimal integer below 2^256")]
    Value(String),

    #[error("{field} must be {encoding} encoded")]
    Field {
        field: &'static str,
        encoding: &'static str,
    },
}

/// Errors surfaced by batch submission and reconciliation.
///
/// Only the validation variants are meant for API callers; the rest are
/// infrastructure failures.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch must contain at least one group")]
    EmptyBatch,

    #[error("Group {index} of the batch is empty")]
    EmptyGroup { index: usize },

    #[error("Duplicate batch detected with id '{id}' for address {address}")]
    DuplicateBatch { id: String, address: String },

    #[error("Sender for all transactions should be '{expected}', found '{found}'")]
    SenderMismatch { expected: String, found: String },

    #[error("Malformed transaction payload: {0}")]
    MalformedPayload(String),

    #[error("Malformed transaction payload: {0}")]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl BatchError {
    /// Whether the error should be reported to the caller as a bad request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BatchError::EmptyBatch
                | BatchError::EmptyGroup { .. }
                | BatchError::DuplicateBatch { .. }
                | BatchError::SenderMismatch { .. }
                | BatchError::MalformedPayload(_)
                | BatchError::Encoding(_)
        )
    }
}

/// Result type for batch engine operations.
pub type Result<T> = std::result::Result<T, BatchError>;
