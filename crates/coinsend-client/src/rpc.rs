//! HTTP client for a CometBFT node and its Cosmos SDK REST gateway

use crate::broadcast::{
    Account, AccountQuerier, BroadcastResult, Broadcaster, NodeInfo, NodeStatus, QueryError,
    TransportError,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use coinsend_crypto::keys::SECP256K1_PUBKEY_TYPE_URL;
use coinsend_crypto::PublicKey;
use coinsend_log::{debug, warn};
use coinsend_types::AccAddress;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

/// gRPC status code the REST gateway reports for a missing account
const GRPC_NOT_FOUND: i64 = 5;

/// JSON-RPC 2.0 request
#[derive(Serialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub id: Value,
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Deserialize)]
struct BroadcastTxResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    codespace: String,
    #[serde(default)]
    log: String,
    hash: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    node_info: StatusNodeInfo,
    sync_info: StatusSyncInfo,
}

#[derive(Deserialize)]
struct StatusNodeInfo {
    network: String,
}

#[derive(Deserialize)]
struct StatusSyncInfo {
    latest_block_height: String,
    #[serde(default)]
    catching_up: bool,
}

/// Talks to one node: JSON-RPC for status and broadcast, REST for accounts.
pub struct NodeClient {
    http: HttpClient,
    rpc_url: Url,
    api_url: Url,
    bech32_prefix: String,
    next_id: AtomicU64,
}

impl NodeClient {
    pub fn new(
        rpc_endpoint: &str,
        api_endpoint: &str,
        bech32_prefix: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let rpc_url = Url::parse(rpc_endpoint)
            .map_err(|e| TransportError::Request(format!("rpc endpoint {rpc_endpoint}: {e}")))?;
        let api_url = Url::parse(api_endpoint)
            .map_err(|e| TransportError::Request(format!("api endpoint {api_endpoint}: {e}")))?;

        Ok(Self {
            http,
            rpc_url,
            api_url,
            bech32_prefix: bech32_prefix.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn rpc_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, TransportError> {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        };
        debug!(method, id = request.id, "rpc request");

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;
        let parsed: RpcResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                TransportError::InvalidResponse(e.to_string())
            } else {
                TransportError::Status {
                    status: status.as_u16(),
                    body: body.clone(),
                }
            }
        })?;

        if let Some(error) = parsed.error {
            let message = match error.data {
                Some(data) if !data.is_empty() => format!("{}: {data}", error.message),
                _ => error.message,
            };
            return Err(TransportError::Rpc {
                code: error.code,
                message,
            });
        }

        parsed
            .result
            .ok_or_else(|| TransportError::InvalidResponse(format!("{method}: no result")))
    }

    fn api_endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::Request(e.to_string()))
    }

    /// Probe the REST gateway with a cheap read.
    pub async fn bank_params(&self) -> Result<Value, TransportError> {
        let url = self.api_endpoint("cosmos/bank/v1beta1/params")?;
        let response = self.http.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(request_error)?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl NodeStatus for NodeClient {
    async fn status(&self) -> Result<NodeInfo, TransportError> {
        let status: StatusResponse = self.rpc_request("status", json!({})).await?;
        let latest_block_height = status
            .sync_info
            .latest_block_height
            .parse()
            .map_err(|_| {
                TransportError::InvalidResponse(format!(
                    "latest_block_height {:?}",
                    status.sync_info.latest_block_height
                ))
            })?;

        Ok(NodeInfo {
            network: status.node_info.network,
            latest_block_height,
            catching_up: status.sync_info.catching_up,
        })
    }
}

#[async_trait]
impl Broadcaster for NodeClient {
    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> Result<BroadcastResult, TransportError> {
        let tx = general_purpose::STANDARD.encode(tx_bytes);
        let response: BroadcastTxResponse = self
            .rpc_request("broadcast_tx_sync", json!({ "tx": tx }))
            .await?;
        let hash = hex::decode(&response.hash)
            .map_err(|e| TransportError::InvalidResponse(format!("hash {}: {e}", response.hash)))?;

        Ok(BroadcastResult {
            code: response.code,
            codespace: response.codespace,
            hash,
            log: response.log,
        })
    }
}

#[async_trait]
impl AccountQuerier for NodeClient {
    async fn query_account(&self, address: &AccAddress) -> Result<Account, QueryError> {
        let bech32 = address
            .to_bech32(&self.bech32_prefix)
            .map_err(|e| QueryError::InvalidResponse(e.to_string()))?;
        let url = self.api_endpoint(&format!("cosmos/auth/v1beta1/accounts/{bech32}"))?;

        let response = self.http.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(request_error)?;
        let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        if status == StatusCode::NOT_FOUND
            || json.get("code").and_then(Value::as_i64) == Some(GRPC_NOT_FOUND)
        {
            return Err(QueryError::NotFound(bech32));
        }
        if !status.is_success() {
            return Err(QueryError::InvalidResponse(format!("HTTP {status}: {body}")));
        }

        let account = parse_account(&json, address)?;
        debug!(
            address = %bech32,
            account_number = account.account_number,
            sequence = account.sequence,
            "queried account"
        );
        Ok(account)
    }
}

/// Walk vesting and module account wrappers down to the embedded base account.
fn find_base_account(value: &Value) -> Option<&Value> {
    if value.get("account_number").is_some() {
        return Some(value);
    }
    ["base_account", "base_vesting_account"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(find_base_account)
}

fn u64_field(value: &Value, field: &str) -> Result<u64, QueryError> {
    match value.get(field) {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| QueryError::InvalidResponse(format!("{field}: {s:?}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| QueryError::InvalidResponse(format!("{field}: {n}"))),
        // proto3 JSON omits zero values
        None | Some(Value::Null) => Ok(0),
        Some(other) => Err(QueryError::InvalidResponse(format!("{field}: {other}"))),
    }
}

fn parse_public_key(value: &Value) -> Result<Option<PublicKey>, QueryError> {
    if value.is_null() {
        return Ok(None);
    }
    let type_url = value.get("@type").and_then(Value::as_str).unwrap_or_default();
    if type_url != SECP256K1_PUBKEY_TYPE_URL {
        warn!(type_url, "account public key has an unsupported type");
        return Ok(None);
    }
    let key = value
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::InvalidResponse("pub_key without key".to_string()))?;
    let bytes = general_purpose::STANDARD
        .decode(key)
        .map_err(|e| QueryError::InvalidResponse(format!("pub_key: {e}")))?;
    PublicKey::from_bytes(&bytes)
        .map(Some)
        .map_err(|e| QueryError::InvalidResponse(e.to_string()))
}

pub(crate) fn parse_account(body: &Value, address: &AccAddress) -> Result<Account, QueryError> {
    let wrapped = body
        .get("account")
        .ok_or_else(|| QueryError::InvalidResponse("missing account".to_string()))?;
    let base = find_base_account(wrapped)
        .ok_or_else(|| QueryError::InvalidResponse("no base account".to_string()))?;

    if let Some(reported) = base.get("address").and_then(Value::as_str) {
        let (_, reported) = AccAddress::from_bech32(reported)
            .map_err(|e| QueryError::InvalidResponse(format!("address: {e}")))?;
        if reported != *address {
            return Err(QueryError::InvalidResponse(format!(
                "asked for {address}, node answered for {reported}"
            )));
        }
    }

    Ok(Account {
        address: *address,
        account_number: u64_field(base, "account_number")?,
        sequence: u64_field(base, "sequence")?,
        public_key: parse_public_key(base.get("pub_key").unwrap_or(&Value::Null))?,
    })
}
