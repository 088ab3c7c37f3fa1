//! Thin JSON-RPC chain client
//!
//! The minimal slice of the node API this service exercises: current slot,
//! program account scans, and single-account fetches, plus a websocket
//! program subscription for push mode. Everything returns typed errors the
//! callers treat as transient; only the supervisor decides whether a dead
//! stream is fatal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use types::Pubkey;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Malformed(String),

    #[error("websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A raw account observed on chain.
#[derive(Debug, Clone)]
pub struct KeyedAccount {
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
    pub slot: u64,
}

/// JSON-RPC client over HTTP, with a websocket side-channel for push mode.
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
    ws_endpoint: String,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: String, ws_endpoint: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            endpoint,
            ws_endpoint,
            request_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: Value = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(RpcError::Node {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::Malformed("missing result".to_string()))
    }

    /// Current chain slot.
    pub async fn get_slot(&self) -> Result<u64, RpcError> {
        self.call("getSlot", json!([{"commitment": "confirmed"}]))
            .await?
            .as_u64()
            .ok_or_else(|| RpcError::Malformed("non-integer slot".to_string()))
    }

    /// All accounts owned by `program`, with their raw data.
    pub async fn get_program_accounts(
        &self,
        program: &Pubkey,
    ) -> Result<Vec<KeyedAccount>, RpcError> {
        let result = self
            .call(
                "getProgramAccounts",
                json!([
                    program.to_string(),
                    {"encoding": "base64", "commitment": "confirmed", "withContext": true}
                ]),
            )
            .await?;

        let slot = result
            .pointer("/context/slot")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let entries = result
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| RpcError::Malformed("missing account list".to_string()))?;

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            match decode_keyed_account(entry, slot) {
                Some(account) => out.push(account),
                None => debug!("skipping undecodable program account entry"),
            }
        }
        Ok(out)
    }

    /// Raw data of a single account, `None` if it does not exist.
    pub async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([pubkey.to_string(), {"encoding": "base64", "commitment": "confirmed"}]),
            )
            .await?;
        let Some(value) = result.get("value").filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let encoded = value
            .pointer("/data/0")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Malformed("missing account data".to_string()))?;
        let data = BASE64
            .decode(encoded)
            .map_err(|e| RpcError::Malformed(format!("bad base64 account data: {e}")))?;
        Ok(Some(data))
    }

    /// Subscribe to every account change under `program`, forwarding raw
    /// updates into `tx`. Returns when the socket closes or the receiver is
    /// dropped; the caller owns reconnect policy.
    pub async fn subscribe_program(
        &self,
        program: &Pubkey,
        tx: mpsc::Sender<KeyedAccount>,
    ) -> Result<(), RpcError> {
        let (mut socket, _) = connect_async(&self.ws_endpoint).await?;
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "programSubscribe",
            "params": [program.to_string(), {"encoding": "base64", "commitment": "confirmed"}],
        });
        socket.send(Message::Text(request.to_string())).await?;

        while let Some(message) = socket.next().await {
            let message = message?;
            let Message::Text(text) = message else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                warn!("dropping unparseable subscription frame");
                continue;
            };
            let Some(params) = value.pointer("/params/result") else {
                // Subscription confirmation or unrelated frame.
                continue;
            };
            let slot = params
                .pointer("/context/slot")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let Some(entry) = params.get("value") else {
                continue;
            };
            let Some(account) = decode_keyed_account(entry, slot) else {
                continue;
            };
            if tx.send(account).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Decode one `{pubkey, account}` JSON entry into raw bytes.
fn decode_keyed_account(entry: &Value, slot: u64) -> Option<KeyedAccount> {
    let pubkey: Pubkey = entry.get("pubkey")?.as_str()?.parse().ok()?;
    let encoded = entry.pointer("/account/data/0")?.as_str()?;
    let data = BASE64.decode(encoded).ok()?;
    Some(KeyedAccount { pubkey, data, slot })
}
