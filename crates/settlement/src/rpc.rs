//! Minimal Ethereum JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use rewardcraft_core::{encode_address, encode_hash, parse_hash, Address, RewardsError, TxHash};

use crate::abi;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("RPC request error: {0}")]
    Transport(String),

    #[error("RPC HTTP {0}")]
    Http(u16),

    /// Error object returned by the node. The message is kept verbatim.
    #[error("{message}")]
    Node { code: i64, message: String },

    #[error("RPC parse error: {0}")]
    Parse(String),

    #[error("RPC: empty result for {0}")]
    EmptyResult(&'static str),
}

impl RpcError {
    /// Errors on read paths: the state could not be checked.
    pub fn into_read_error(self) -> RewardsError {
        RewardsError::DataUnavailable(self.to_string())
    }

    /// Errors on the claim path: shown to the user as-is.
    pub fn into_send_error(self) -> RewardsError {
        RewardsError::TransactionFailed(self.to_string())
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Subset of `eth_getTransactionReceipt` we act on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    /// `"0x1"` success, `"0x0"` reverted
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() != Some("0x0")
    }
}

pub struct EthRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one call. A `null` result comes back as `Value::Null`.
    async fn call_raw(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("RPC {} -> {}", method, self.url);

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Http(status.as_u16()));
        }

        let parsed: RpcResponse = resp
            .json()
            .await
            .map_err(|e| RpcError::Parse(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> std::result::Result<T, RpcError> {
        let value = self.call_raw(method, params).await?;
        if value.is_null() {
            return Err(RpcError::EmptyResult(method));
        }
        serde_json::from_value(value).map_err(|e| RpcError::Parse(e.to_string()))
    }

    pub async fn chain_id(&self) -> std::result::Result<u64, RpcError> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        abi::parse_quantity(&raw).map_err(|e| RpcError::Parse(e.to_string()))
    }

    /// `eth_call` against the latest block.
    pub async fn eth_call(&self, to: &Address, data: &[u8]) -> std::result::Result<Vec<u8>, RpcError> {
        self.eth_call_at(None, to, data, "latest").await
    }

    /// `eth_call` as `from` at `block` (a quantity or tag). Replaying a
    /// reverted transaction this way returns its revert reason as a node
    /// error.
    pub async fn eth_call_at(
        &self,
        from: Option<&Address>,
        to: &Address,
        data: &[u8],
        block: &str,
    ) -> std::result::Result<Vec<u8>, RpcError> {
        let mut call = json!({ "to": encode_address(to), "data": abi::to_data(data) });
        if let Some(from) = from {
            call["from"] = json!(encode_address(from));
        }
        let raw: String = self.call("eth_call", json!([call, block])).await?;
        abi::parse_data(&raw).map_err(|e| RpcError::Parse(e.to_string()))
    }

    /// `eth_sendTransaction`; the endpoint signs for `from`.
    pub async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> std::result::Result<TxHash, RpcError> {
        let raw: String = self
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": encode_address(from),
                    "to": encode_address(to),
                    "data": abi::to_data(data),
                }]),
            )
            .await?;
        parse_hash(&raw).map_err(|e| RpcError::Parse(e.to_string()))
    }

    /// `None` while the transaction is still pending.
    pub async fn transaction_receipt(
        &self,
        tx: &TxHash,
    ) -> std::result::Result<Option<TxReceipt>, RpcError> {
        let value = self
            .call_raw("eth_getTransactionReceipt", json!([encode_hash(tx)]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RpcError::Parse(e.to_string()))
    }
}
