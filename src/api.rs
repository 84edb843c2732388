//! Admin HTTP API

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coinsend_client::{ErrorKind, SendError, TransferClient};
use coinsend_keyring::{KeyWriter, KeyringError};
use coinsend_log::{error, info};
use coinsend_math::parse_coins;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<TransferClient>,
    pub keys: Arc<dyn KeyWriter>,
    pub bech32_prefix: String,
    /// Cancelled on shutdown; in-flight sends stop at their next stage.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
pub struct SendTransactionRequest {
    pub sender: String,
    pub receiver: String,
    /// Coin list such as `100stake`
    pub amount: String,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendTransactionResponse {
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error("address encoding failed: {0}")]
    Address(String),

    #[error("request body too large")]
    BodyTooLarge,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::BodyTooLarge;
        }
        ApiError::Send(SendError::Validation(format!(
            "request body: {}",
            rejection.body_text()
        )))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Send(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::KeyNotFound => StatusCode::NOT_FOUND,
                ErrorKind::BroadcastRejected => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::AccountQuery | ErrorKind::Transport => StatusCode::BAD_GATEWAY,
                ErrorKind::Encoding | ErrorKind::Signing => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::Keyring(_) | ApiError::Address(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Send(err) => err.kind().as_str(),
            ApiError::Keyring(_) | ApiError::Address(_) => "keyring",
            ApiError::BodyTooLarge => ErrorKind::Validation.as_str(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/send_transaction", post(send_transaction))
        .route("/address", get(new_address))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn coins_field(field: &str, expr: &str) -> Result<coinsend_math::Coins, SendError> {
    parse_coins(expr).map_err(|e| SendError::Validation(format!("{field}: {e}")))
}

async fn send_transaction(
    State(state): State<AppState>,
    body: Result<Json<SendTransactionRequest>, JsonRejection>,
) -> Result<Json<SendTransactionResponse>, ApiError> {
    let Json(body) = body?;
    let amount = coins_field("amount", &body.amount)?;
    let fee = body
        .fee
        .as_deref()
        .map(|fee| coins_field("fee", fee))
        .transpose()?;

    let request = state.client.request(
        body.sender,
        body.receiver,
        amount,
        fee,
        body.gas_limit,
        body.memo,
    );
    let cancel = state.shutdown.child_token();
    let receipt = state.client.send(&request, &cancel).await?;

    Ok(Json(SendTransactionResponse { hash: receipt.hash }))
}

async fn new_address(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AddressResponse>), ApiError> {
    let name = uuid::Uuid::new_v4().to_string();
    // the mnemonic is dropped here; the key itself stays in the store
    let (info, _mnemonic) = state.keys.create_key(&name).await?;
    let address = info
        .address
        .to_bech32(&state.bech32_prefix)
        .map_err(|e| ApiError::Address(e.to_string()))?;
    info!(%name, %address, "created key");

    Ok((StatusCode::CREATED, Json(AddressResponse { address })))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use coinsend_client::{
        Account, AccountQuerier, BroadcastResult, Broadcaster, KeyStoreResolver, PipelineConfig,
        QueryError, TransportError,
    };
    use coinsend_crypto::PrivateKey;
    use coinsend_keyring::{KeyStore, MemoryKeyStore};
    use coinsend_types::AccAddress;
    use tower::ServiceExt;

    const ALICE: &str = "1e99423a4ed27608a15a2616a2b0e9e52ced330ac530edcc32c8ffc6a526aedd";
    const BOB: &str = "c87509a1c067bbde78beb793e6fa76530b6382a4c0241e5e4a9ec0a0f44dc0d3";

    struct Node {
        code: u32,
    }

    #[async_trait]
    impl AccountQuerier for Node {
        async fn query_account(&self, address: &AccAddress) -> Result<Account, QueryError> {
            Ok(Account {
                address: *address,
                account_number: 5,
                sequence: 2,
                public_key: None,
            })
        }
    }

    #[async_trait]
    impl Broadcaster for Node {
        async fn broadcast_sync(&self, _tx: &[u8]) -> Result<BroadcastResult, TransportError> {
            Ok(BroadcastResult {
                code: self.code,
                codespace: "sdk".to_string(),
                hash: vec![0xab, 0xcd],
                log: if self.code == 0 {
                    String::new()
                } else {
                    "insufficient fee".to_string()
                },
            })
        }
    }

    fn bech32(secret: &str) -> String {
        PrivateKey::from_hex(secret)
            .unwrap()
            .public_key()
            .to_address()
            .to_bech32("cosmos")
            .unwrap()
    }

    fn app(code: u32) -> (Router, Arc<MemoryKeyStore>) {
        let store = Arc::new(MemoryKeyStore::new());
        store
            .insert("alice", PrivateKey::from_hex(ALICE).unwrap())
            .unwrap();
        let node = Arc::new(Node { code });
        let client = TransferClient::new(
            PipelineConfig::default(),
            Arc::new(KeyStoreResolver::new(store.clone())),
            node.clone(),
            node,
        );
        let state = AppState {
            client: Arc::new(client),
            keys: store.clone(),
            bech32_prefix: "cosmos".to_string(),
            shutdown: CancellationToken::new(),
        };
        (router(state, 64 * 1024), store)
    }

    fn send_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/send_transaction")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(0);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_send_transaction() {
        let (app, _) = app(0);
        let response = app
            .oneshot(send_request(serde_json::json!({
                "sender": bech32(ALICE),
                "receiver": bech32(BOB),
                "amount": "100stake",
                "fee": "10stake",
                "memo": "thanks"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: SendTransactionResponse = json_body(response).await;
        assert_eq!(body.hash, "abcd");
    }

    #[tokio::test]
    async fn test_send_error_statuses() {
        let cases = [
            (0, bech32(ALICE), "lots", StatusCode::BAD_REQUEST, "validation"),
            (0, bech32(BOB), "1stake", StatusCode::NOT_FOUND, "key_not_found"),
            (
                13,
                bech32(ALICE),
                "1stake",
                StatusCode::UNPROCESSABLE_ENTITY,
                "broadcast_rejected",
            ),
        ];

        for (code, sender, amount, status, kind) in cases {
            let (app, _) = app(code);
            let receiver = if sender == bech32(BOB) {
                bech32(ALICE)
            } else {
                bech32(BOB)
            };
            let response = app
                .oneshot(send_request(serde_json::json!({
                    "sender": sender,
                    "receiver": receiver,
                    "amount": amount,
                })))
                .await
                .unwrap();
            assert_eq!(response.status(), status);
            let body: ErrorBody = json_body(response).await;
            assert_eq!(body.kind, kind);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let incomplete = serde_json::json!({ "sender": bech32(ALICE) }).to_string();
        for raw in [incomplete, "{\"sender\":".to_string()] {
            let (app, _) = app(0);
            let response = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/send_transaction")
                        .header("content-type", "application/json")
                        .body(Body::from(raw))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: ErrorBody = json_body(response).await;
            assert_eq!(body.kind, "validation");
            assert!(body.error.starts_with("invalid request: request body:"), "{}", body.error);
        }
    }

    #[tokio::test]
    async fn test_new_address_creates_key() {
        let (app, store) = app(0);
        let response = app
            .oneshot(Request::builder().uri("/address").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: AddressResponse = json_body(response).await;
        assert!(body.address.starts_with("cosmos1"));
        assert_eq!(store.list().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let (app, _) = app(0);
        let response = app
            .oneshot(send_request(serde_json::json!({
                "sender": "x".repeat(100 * 1024),
                "receiver": "y",
                "amount": "1stake",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
