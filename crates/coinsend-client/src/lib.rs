//! Client side of a Cosmos SDK bank transfer.
//!
//! A send runs through a fixed sequence of stages: resolve the sender's key,
//! fetch its account state, build the unsigned envelope, compute the sign
//! bytes, sign, assemble, encode and broadcast. Each stage is its own type so
//! it can be exercised alone; [`TransferClient`] strings them together.

pub mod broadcast;
pub mod builder;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod rpc;
pub mod signer;

pub use broadcast::{
    Account, AccountQuerier, BroadcastResult, Broadcaster, NodeInfo, NodeStatus, QueryError,
    TransportError,
};
pub use builder::{BuilderConfig, SignerPlaceholder, TransactionBuilder, TransferRequest};
pub use config::{ClientConfig, ConfigError, PipelineConfig};
pub use error::{ErrorKind, ErrorOrigin, SendError};
pub use pipeline::{PreparedTx, SendReceipt, SendStage, TransferClient};
pub use resolver::{
    AddressResolver, CustodyBackend, CustodyResolver, KeyStoreResolver, ResolveError,
    SingleKeyResolver, UnconfiguredCustody,
};
pub use rpc::NodeClient;
pub use signer::{Signer, TxSignature};

pub use coinsend_crypto::SignerData;
pub use coinsend_types::{SignMode, TxEncoder};
pub use tokio_util::sync::CancellationToken;
