//! Client for chain indexing APIs (Etherscan-style endpoints).
//!
//! Every outbound call is raced against a fixed wall-clock timeout and
//! retried once on transport failure; callers decide whether a failure is
//! fatal (ABI fetch) or just a miss (proxy heuristics).

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::chains::Chain;
use crate::error::BindError;

/// Sentinel the explorer returns for unverified source.
pub const NOT_VERIFIED_SENTINEL: &str = "Contract source code not verified";

const CALL_TIMEOUT: Duration = Duration::from_secs(10);
const RETRIES: usize = 1;

/// Shared explorer API response envelope.
#[derive(Debug, Deserialize)]
struct ExplorerResponse<T> {
    status: String,
    message: String,
    result: T,
}

/// JSON-RPC style envelope used by the `module=proxy` actions.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
}

/// Raw log entry as returned by the logs endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub topics: Vec<String>,
    pub data: String,
}

/// Outcome of an ABI lookup for a verified-or-not contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiOutcome {
    /// Raw interface description text; still needs JSON parsing.
    Verified(String),
    /// The explorer has no verified source for this address.
    NotVerified,
}

/// The chain-indexing API surface the pipeline consumes.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Fetch the interface description for a verified contract.
    async fn get_abi(&self, address: Address) -> Result<AbiOutcome, BindError>;

    /// Fetch historical logs for `address` matching `topic0`, oldest first.
    async fn get_logs(&self, address: Address, topic0: &str) -> Result<Vec<LogEntry>, BindError>;

    /// Read raw storage at `slot` (0x-prefixed 32-byte hex).
    async fn get_storage_at(&self, address: Address, slot: &str) -> Result<String, BindError>;

    /// Fetch deployed bytecode (0x-prefixed hex).
    async fn get_code(&self, address: Address) -> Result<String, BindError>;

    /// Read-only contract call with pre-encoded calldata.
    async fn eth_call(&self, to: Address, data: &str) -> Result<String, BindError>;
}

/// HTTP implementation over a chain's explorer API.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    chain: Chain,
    api_key: String,
    client: reqwest::Client,
}

impl ExplorerClient {
    pub fn new(chain: Chain) -> Self {
        Self::with_api_key(chain, chain.api_key)
    }

    pub fn with_api_key(chain: Chain, api_key: impl Into<String>) -> Self {
        Self {
            chain,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        query: &[(&str, &str)],
    ) -> Result<T, BindError> {
        let mut last = BindError::Network("request not attempted".to_string());
        for attempt in 0..=RETRIES {
            match tokio::time::timeout(CALL_TIMEOUT, self.send(query)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last = e,
                Err(_) => {
                    last = BindError::Network(format!(
                        "request timed out after {}s",
                        CALL_TIMEOUT.as_secs()
                    ))
                }
            }
            tracing::debug!(attempt, chain = self.chain.name, error = %last, "explorer request failed");
        }
        Err(last)
    }

    async fn send<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<T, BindError> {
        let response = self
            .client
            .get(self.chain.api_url)
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| BindError::Network(format!("Failed to send request: {e}")))?;

        if !response.status().is_success() {
            return Err(BindError::Network(format!(
                "Explorer API error: {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BindError::Network(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl ChainApi for ExplorerClient {
    async fn get_abi(&self, address: Address) -> Result<AbiOutcome, BindError> {
        let address = address.to_string();
        let response: ExplorerResponse<serde_json::Value> = self
            .get_json(&[
                ("module", "contract"),
                ("action", "getabi"),
                ("address", &address),
            ])
            .await?;

        if let Some(text) = response.result.as_str() {
            if text == NOT_VERIFIED_SENTINEL {
                return Ok(AbiOutcome::NotVerified);
            }
            if response.status == "1" {
                return Ok(AbiOutcome::Verified(text.to_string()));
            }
        }
        Err(BindError::Network(format!(
            "Explorer error: {}",
            response.message
        )))
    }

    async fn get_logs(&self, address: Address, topic0: &str) -> Result<Vec<LogEntry>, BindError> {
        let address = address.to_string();
        let response: ExplorerResponse<serde_json::Value> = self
            .get_json(&[
                ("module", "logs"),
                ("action", "getLogs"),
                ("fromBlock", "0"),
                ("toBlock", "latest"),
                ("address", &address),
                ("topic0", topic0),
            ])
            .await?;

        // "No records found" comes back with a non-array result.
        match response.result {
            serde_json::Value::Array(entries) => entries
                .into_iter()
                .map(|entry| {
                    serde_json::from_value(entry)
                        .map_err(|e| BindError::Network(format!("Malformed log entry: {e}")))
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    async fn get_storage_at(&self, address: Address, slot: &str) -> Result<String, BindError> {
        let address = address.to_string();
        let response: RpcResponse = self
            .get_json(&[
                ("module", "proxy"),
                ("action", "eth_getStorageAt"),
                ("address", &address),
                ("position", slot),
                ("tag", "latest"),
            ])
            .await?;
        response
            .result
            .ok_or_else(|| BindError::Network("empty storage response".to_string()))
    }

    async fn get_code(&self, address: Address) -> Result<String, BindError> {
        let address = address.to_string();
        let response: RpcResponse = self
            .get_json(&[
                ("module", "proxy"),
                ("action", "eth_getCode"),
                ("address", &address),
                ("tag", "latest"),
            ])
            .await?;
        response
            .result
            .ok_or_else(|| BindError::Network("empty code response".to_string()))
    }

    async fn eth_call(&self, to: Address, data: &str) -> Result<String, BindError> {
        let to = to.to_string();
        let response: RpcResponse = self
            .get_json(&[
                ("module", "proxy"),
                ("action", "eth_call"),
                ("to", &to),
                ("data", data),
                ("tag", "latest"),
            ])
            .await?;
        response
            .result
            .ok_or_else(|| BindError::Network("empty call response".to_string()))
    }
}
