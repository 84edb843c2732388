//! The send pipeline
//!
//! A send moves through the [`SendStage`]s in order and stops at the first
//! failure. Nothing is retried. The two network calls race the caller's
//! cancellation token and the configured deadline; every other stage is CPU
//! only and checks the token before it starts.

use crate::broadcast::{Account, AccountQuerier, Broadcaster, NodeInfo, NodeStatus};
use crate::builder::{SignerPlaceholder, TransactionBuilder, TransferRequest};
use crate::config::PipelineConfig;
use crate::error::SendError;
use crate::resolver::{AddressResolver, ResolveError};
use crate::rpc::NodeClient;
use crate::signer::Signer;
use coinsend_crypto::{SignDocCodec, SignerData, TransactionVerifier};
use coinsend_log::{debug, info, warn};
use coinsend_math::Coins;
use coinsend_types::{AccAddress, SignedTx, TxEncoder};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendStage {
    Validating,
    Resolving,
    QueryingAccount,
    Building,
    EncodingSignDoc,
    Signing,
    Assembling,
    EncodingWire,
    Broadcasting,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SendStage::Validating => "validating",
            SendStage::Resolving => "resolving signer",
            SendStage::QueryingAccount => "querying account",
            SendStage::Building => "building",
            SendStage::EncodingSignDoc => "encoding sign doc",
            SendStage::Signing => "signing",
            SendStage::Assembling => "assembling",
            SendStage::EncodingWire => "encoding wire bytes",
            SendStage::Broadcasting => "broadcasting",
        };
        f.write_str(name)
    }
}

/// A signed, encoded transaction that has not been broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    pub signed: SignedTx,
    /// Account state the signature is bound to
    pub signer: SignerData,
    pub sign_bytes: Vec<u8>,
    pub tx_bytes: Vec<u8>,
}

/// Outcome of an accepted broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Hash reported by the node, lowercase hex
    pub hash: String,
    /// SHA-256 of the wire bytes, uppercase hex
    pub local_hash: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Runs sends for one chain. Shareable across tasks; each send is
/// independent and holds no state between calls.
pub struct TransferClient {
    config: PipelineConfig,
    /// Read-only key lookup, safe to call from concurrent sends
    resolver: Arc<dyn AddressResolver>,
    /// Source of account number, sequence and on-chain public key
    accounts: Arc<dyn AccountQuerier>,
    broadcaster: Arc<dyn Broadcaster>,
    builder: TransactionBuilder,
    codec: SignDocCodec,
    signer: Signer,
    verifier: TransactionVerifier,
    encoder: TxEncoder,
}

impl TransferClient {
    pub fn new(
        config: PipelineConfig,
        resolver: Arc<dyn AddressResolver>,
        accounts: Arc<dyn AccountQuerier>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            builder: TransactionBuilder::new(config.builder.clone()),
            config,
            resolver,
            accounts,
            broadcaster,
            codec: SignDocCodec,
            signer: Signer,
            verifier: TransactionVerifier::new(),
            encoder: TxEncoder,
        }
    }

    /// Build a client backed by the configured node, after checking once
    /// that both its RPC and REST endpoints answer.
    pub async fn connect(
        config: PipelineConfig,
        resolver: Arc<dyn AddressResolver>,
    ) -> Result<Self, SendError> {
        let node = Arc::new(NodeClient::new(
            &config.rpc_endpoint,
            &config.api_endpoint,
            &config.builder.bech32_prefix,
            config.timeout,
        )?);

        let status = probe(&node, &config.chain_id).await?;
        info!(
            network = %status.network,
            height = status.latest_block_height,
            rpc = %config.rpc_endpoint,
            api = %config.api_endpoint,
            "connected to node"
        );

        Ok(Self::new(config, resolver, node.clone(), node))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A request for this client's chain, with the configured gas limit and
    /// fee filled in where the caller gave none.
    pub fn request(
        &self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Coins,
        fee: Option<Coins>,
        gas_limit: Option<u64>,
        memo: Option<String>,
    ) -> TransferRequest {
        let gas_limit = gas_limit.unwrap_or(self.config.default_gas_limit);
        let fee = fee.unwrap_or_else(|| self.config.fee_for(gas_limit));
        TransferRequest {
            sender: sender.into(),
            receiver: receiver.into(),
            amount: amount.into_vec(),
            fee: fee.into_vec(),
            gas_limit,
            chain_id: self.config.chain_id.clone(),
            memo,
        }
    }

    /// Run every stage up to, but not including, the broadcast.
    pub async fn prepare(
        &self,
        request: &TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<PreparedTx, SendError> {
        enter(SendStage::Validating, cancel)?;
        if request.chain_id != self.config.chain_id {
            return Err(SendError::Validation(format!(
                "chain id {} does not match configured {}",
                request.chain_id, self.config.chain_id
            )));
        }
        let msg = request.to_msg()?;
        let fee = request.fee_coins()?;
        self.builder
            .validate(&msg, &fee, request.gas_limit, &request.chain_id, request.memo())?;
        let prefix = &self.config.builder.bech32_prefix;
        let sender = AccAddress::parse_with_prefix(&msg.from_address, prefix)
            .map_err(|e| SendError::Validation(format!("sender: {e}")))?;

        enter(SendStage::Resolving, cancel)?;
        let key = self.resolver.resolve(&sender).map_err(|e| match e {
            ResolveError::KeyNotFound(_) => SendError::KeyNotFound(msg.from_address.clone()),
            other => other.into(),
        })?;
        let public_key = key.public_key();

        enter(SendStage::QueryingAccount, cancel)?;
        let account: Account = self
            .network(SendStage::QueryingAccount, cancel, async {
                self.accounts
                    .query_account(&sender)
                    .await
                    .map_err(SendError::from)
            })
            .await?;
        if let Some(on_chain) = &account.public_key {
            if *on_chain != public_key {
                return Err(SendError::AccountQuery(format!(
                    "account {} is registered with a different public key",
                    msg.from_address
                )));
            }
        }
        let signer_data = SignerData {
            chain_id: request.chain_id.clone(),
            account_number: account.account_number,
            sequence: account.sequence,
        };

        enter(SendStage::Building, cancel)?;
        let unsigned = self.builder.build(
            msg,
            fee,
            request.gas_limit,
            &request.chain_id,
            request.memo(),
            SignerPlaceholder {
                public_key,
                sequence: account.sequence,
            },
        )?;

        enter(SendStage::EncodingSignDoc, cancel)?;
        let sign_mode = self.config.builder.sign_mode;
        let sign_bytes = self.codec.encode(&signer_data, &unsigned, sign_mode)?;

        enter(SendStage::Signing, cancel)?;
        let signature = self.signer.sign_with_mode(&key, sign_mode, &sign_bytes)?;

        enter(SendStage::Assembling, cancel)?;
        let signed = self.signer.assemble(unsigned, signature)?;
        self.verifier.verify(&signed, &signer_data)?;

        enter(SendStage::EncodingWire, cancel)?;
        let tx_bytes = self.encoder.encode(&signed)?;

        Ok(PreparedTx {
            signed,
            signer: signer_data,
            sign_bytes,
            tx_bytes,
        })
    }

    /// Sign and broadcast a transfer, returning the node's hash for it.
    ///
    /// Concurrent sends from the same account race on its sequence number;
    /// callers that need that must serialize sends per account themselves.
    pub async fn send(
        &self,
        request: &TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<SendReceipt, SendError> {
        let result = self.run(request, cancel).await;
        if let Err(err) = &result {
            match err {
                SendError::BroadcastRejected { code, codespace, log } => {
                    warn!(sender = %request.sender, code, %codespace, %log, "transaction rejected")
                }
                other => {
                    warn!(sender = %request.sender, kind = %other.kind(), error = %other, "send failed")
                }
            }
        }
        result
    }

    async fn run(
        &self,
        request: &TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<SendReceipt, SendError> {
        let prepared = self.prepare(request, cancel).await?;

        enter(SendStage::Broadcasting, cancel)?;
        let local_hash = self.encoder.tx_hash(&prepared.tx_bytes);
        let result = self
            .network(SendStage::Broadcasting, cancel, async {
                self.broadcaster
                    .broadcast_sync(&prepared.tx_bytes)
                    .await
                    .map_err(SendError::from)
            })
            .await?;
        let hash = result.into_hash()?;

        if !hash.eq_ignore_ascii_case(&local_hash) {
            warn!(node_hash = %hash, %local_hash, "node reported a different transaction hash");
        }
        info!(
            hash = %hash,
            sender = %request.sender,
            sequence = prepared.signer.sequence,
            "transaction accepted"
        );

        Ok(SendReceipt {
            hash,
            local_hash,
            account_number: prepared.signer.account_number,
            sequence: prepared.signer.sequence,
        })
    }

    async fn network<T, F>(
        &self,
        stage: SendStage,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, SendError>
    where
        F: Future<Output = Result<T, SendError>>,
    {
        let deadline = self.config.timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SendError::Cancelled { stage }),
            outcome = tokio::time::timeout(deadline, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(SendError::Transport(format!("{stage} timed out after {deadline:?}"))),
            },
        }
    }
}

fn enter(stage: SendStage, cancel: &CancellationToken) -> Result<(), SendError> {
    if cancel.is_cancelled() {
        return Err(SendError::Cancelled { stage });
    }
    debug!(%stage, "send stage");
    Ok(())
}

async fn probe(node: &NodeClient, chain_id: &str) -> Result<NodeInfo, SendError> {
    let status = node.status().await?;
    if status.network != chain_id {
        warn!(network = %status.network, chain_id, "node serves a different chain");
    }
    if status.catching_up {
        warn!("node is still catching up");
    }
    node.bank_params().await?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SingleKeyResolver;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use coinsend_crypto::PrivateKey;
    use serde_json::{json, Value};
    use std::time::Duration;

    const ALICE: &str = "1e99423a4ed27608a15a2616a2b0e9e52ced330ac530edcc32c8ffc6a526aedd";

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A node whose RPC answers `status` and whose REST gateway answers
    /// bank params with `params_status`.
    fn node(params_status: StatusCode) -> Router {
        Router::new()
            .route(
                "/",
                post(|Json(req): Json<Value>| async move {
                    Json(json!({
                        "jsonrpc": "2.0",
                        "id": req["id"],
                        "result": {
                            "node_info": { "network": "testing" },
                            "sync_info": { "latest_block_height": "7", "catching_up": false }
                        }
                    }))
                }),
            )
            .route(
                "/cosmos/bank/v1beta1/params",
                get(move || async move { (params_status, Json(json!({ "params": {} }))) }),
            )
    }

    fn pipeline_config(rpc: &str, api: &str) -> PipelineConfig {
        PipelineConfig {
            rpc_endpoint: rpc.to_string(),
            api_endpoint: api.to_string(),
            timeout: Duration::from_secs(5),
            ..PipelineConfig::default()
        }
    }

    fn resolver() -> Arc<dyn AddressResolver> {
        Arc::new(SingleKeyResolver::new(PrivateKey::from_hex(ALICE).unwrap()))
    }

    #[tokio::test]
    async fn test_connect_probes_node() {
        let base = spawn(node(StatusCode::OK)).await;
        let client = TransferClient::connect(pipeline_config(&base, &base), resolver()).await;
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_connect_fails_when_rest_gateway_errors() {
        let base = spawn(node(StatusCode::INTERNAL_SERVER_ERROR)).await;
        let result = TransferClient::connect(pipeline_config(&base, &base), resolver()).await;
        assert!(matches!(result, Err(SendError::Transport(_))));
    }

    #[tokio::test]
    async fn test_connect_fails_when_rpc_unreachable() {
        let api = spawn(node(StatusCode::OK)).await;
        let result =
            TransferClient::connect(pipeline_config("http://127.0.0.1:1", &api), resolver()).await;
        assert!(matches!(result, Err(SendError::Transport(_))));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(SendStage::QueryingAccount.to_string(), "querying account");
        let err = SendError::Cancelled {
            stage: SendStage::Broadcasting,
        };
        assert_eq!(err.to_string(), "cancelled while broadcasting");
    }

    #[test]
    fn test_enter_checks_token() {
        let token = CancellationToken::new();
        assert!(enter(SendStage::Signing, &token).is_ok());
        token.cancel();
        assert_eq!(
            enter(SendStage::Signing, &token),
            Err(SendError::Cancelled {
                stage: SendStage::Signing
            })
        );
    }
}
