//! HTTP Gateway Client
//!
//! Talks to the network's public gateway REST API. Every response is wrapped
//! in the gateway envelope `{ "data": ..., "error": "...", "code": "..." }`;
//! a non-empty `error` on a submission is the rejection message reported
//! back on the batch item.

use super::Gateway;
use crate::{BatchTransaction, ObservedTransaction, config::GatewayConfig, error::GatewayError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Standard gateway response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendData {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: ShardStatus,
}

#[derive(Debug, Deserialize)]
struct ShardStatus {
    erd_nonce: u64,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    block: Block,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    #[serde(default)]
    mini_blocks: Vec<MiniBlock>,
}

#[derive(Debug, Deserialize)]
struct MiniBlock {
    #[serde(default)]
    transactions: Vec<ObservedTransaction>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    transaction: ObservedTransaction,
}

/// Gateway client over HTTP
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, Envelope<T>), GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let envelope = response.json::<Envelope<T>>().await?;
        Ok((status, envelope))
    }

    fn unwrap_data<T>(path: &str, envelope: Envelope<T>) -> Result<T, GatewayError> {
        envelope.data.ok_or_else(|| {
            GatewayError::Decode(format!(
                "{} returned no data (code '{}', error '{}')",
                path, envelope.code, envelope.error
            ))
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send_transaction(&self, tx: &BatchTransaction) -> Result<String, GatewayError> {
        let url = format!("{}/transaction/send", self.base_url);
        let response = self.client.post(&url).json(tx).send().await?;
        let envelope = response.json::<Envelope<SendData>>().await?;

        if !envelope.error.is_empty() {
            return Err(GatewayError::Rejected {
                message: envelope.error,
            });
        }

        Ok(Self::unwrap_data("/transaction/send", envelope)?.tx_hash)
    }

    async fn latest_nonce(&self, shard: u32) -> Result<u64, GatewayError> {
        let path = format!("/network/status/{}", shard);
        let (_, envelope) = self.get::<StatusData>(&path).await?;
        Ok(Self::unwrap_data(&path, envelope)?.status.erd_nonce)
    }

    async fn block_transactions(
        &self,
        shard: u32,
        nonce: u64,
    ) -> Result<Vec<ObservedTransaction>, GatewayError> {
        let path = format!("/block/{}/by-nonce/{}?withTxs=true", shard, nonce);
        let (_, envelope) = self.get::<BlockData>(&path).await?;
        let block = Self::unwrap_data(&path, envelope)?.block;

        Ok(block
            .mini_blocks
            .into_iter()
            .flat_map(|mini_block| mini_block.transactions)
            .collect())
    }

    async fn transaction(&self, hash: &str) -> Result<Option<ObservedTransaction>, GatewayError> {
        let path = format!("/transaction/{}?withResults=true", hash);
        let (status, envelope) = self.get::<TransactionData>(&path).await?;

        if status == StatusCode::NOT_FOUND || envelope.error.contains("not found") {
            return Ok(None);
        }

        Ok(Some(Self::unwrap_data(&path, envelope)?.transaction))
    }
}
