//! Boundary to the consensus node: account queries, liveness and broadcast

use crate::error::SendError;
use async_trait::async_trait;
use coinsend_crypto::PublicKey;
use coinsend_types::AccAddress;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("account {0} not found")]
    NotFound(String),

    #[error("invalid account response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// On-chain account state, fetched fresh for every send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: AccAddress,
    pub account_number: u64,
    /// Next sequence the network expects from this account
    pub sequence: u64,
    /// Unset until the account has signed its first transaction
    pub public_key: Option<PublicKey>,
}

/// Synchronous CheckTx outcome of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BroadcastResult {
    pub code: u32,
    pub codespace: String,
    pub hash: Vec<u8>,
    pub log: String,
}

impl BroadcastResult {
    pub fn is_accepted(&self) -> bool {
        self.code == 0
    }

    /// Lowercase hex hash of an accepted transaction, or the rejection.
    pub fn into_hash(self) -> Result<String, SendError> {
        if self.is_accepted() {
            Ok(hex::encode(self.hash))
        } else {
            Err(SendError::BroadcastRejected {
                code: self.code,
                codespace: self.codespace,
                log: self.log,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfo {
    pub network: String,
    pub latest_block_height: u64,
    pub catching_up: bool,
}

#[async_trait]
pub trait AccountQuerier: Send + Sync {
    async fn query_account(&self, address: &AccAddress) -> Result<Account, QueryError>;
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit wire bytes and wait for the node's local validity check.
    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> Result<BroadcastResult, TransportError>;
}

#[async_trait]
pub trait NodeStatus: Send + Sync {
    async fn status(&self) -> Result<NodeInfo, TransportError>;
}
