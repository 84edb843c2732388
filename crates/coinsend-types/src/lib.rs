//! Core types for coinsend
//!
//! Everything a transfer transaction is made of: account addresses, the bank
//! send message, the unsigned and signed envelopes and their protobuf wire
//! encoding.

pub mod address;
pub mod error;
pub mod msgs;
pub mod proto;
pub mod tx;

pub use address::{AccAddress, AddressError};
pub use error::{CodecError, ValidationError};
pub use msgs::{bank::MsgSend, Msg};
pub use proto::{Any, SignMode};
pub use tx::{AuthInfo, Fee, SignedTx, SignerInfo, TxBody, TxEncoder, UnsignedTx};
