//! Protobuf mirrors of the Cosmos SDK transaction messages.
//!
//! Field numbers follow `cosmos/tx/v1beta1/tx.proto`,
//! `cosmos/bank/v1beta1/tx.proto`, `cosmos/base/v1beta1/coin.proto` and
//! `cosmos/crypto/secp256k1/keys.proto`. prost writes fields in ascending tag
//! order and skips proto3 defaults, which gives the same bytes the Go SDK
//! produces for these messages.

use prost::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `google.protobuf.Any`
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

impl Any {
    pub fn from_msg<M: Message>(msg: &M, type_url: impl Into<String>) -> Self {
        Self {
            type_url: type_url.into(),
            value: msg.encode_to_vec(),
        }
    }
}

/// `cosmos.tx.signing.v1beta1.SignMode`
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum SignMode {
    #[serde(rename = "unspecified")]
    Unspecified = 0,
    #[serde(rename = "direct")]
    Direct = 1,
    #[serde(rename = "textual")]
    Textual = 2,
    #[serde(rename = "amino-json", alias = "legacy-amino-json")]
    LegacyAminoJson = 127,
}

impl fmt::Display for SignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignMode::Unspecified => "SIGN_MODE_UNSPECIFIED",
            SignMode::Direct => "SIGN_MODE_DIRECT",
            SignMode::Textual => "SIGN_MODE_TEXTUAL",
            SignMode::LegacyAminoJson => "SIGN_MODE_LEGACY_AMINO_JSON",
        };
        f.write_str(name)
    }
}

/// `cosmos.tx.v1beta1.TxRaw`, the broadcast form
#[derive(Clone, PartialEq, Message)]
pub struct TxRawProto {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

/// `cosmos.tx.v1beta1.SignDoc`, the SIGN_MODE_DIRECT sign bytes
#[derive(Clone, PartialEq, Message)]
pub struct SignDocProto {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxBodyProto {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
    #[prost(message, repeated, tag = "1023")]
    pub extension_options: Vec<Any>,
    #[prost(message, repeated, tag = "2047")]
    pub non_critical_extension_options: Vec<Any>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthInfoProto {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfoProto>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<FeeProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignerInfoProto {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfoProto>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoProto {
    #[prost(oneof = "mode_info_proto::Sum", tags = "1, 2")]
    pub sum: Option<mode_info_proto::Sum>,
}

pub mod mode_info_proto {
    use super::*;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Sum {
        #[prost(message, tag = "1")]
        Single(ModeInfoSingleProto),
        #[prost(message, tag = "2")]
        Multi(ModeInfoMultiProto),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoSingleProto {
    #[prost(enumeration = "SignMode", tag = "1")]
    pub mode: i32,
}

/// Only decoded so multisig transactions fail with a clear error.
#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoMultiProto {
    #[prost(message, optional, tag = "1")]
    pub bitarray: Option<CompactBitArrayProto>,
    #[prost(message, repeated, tag = "2")]
    pub mode_infos: Vec<ModeInfoProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CompactBitArrayProto {
    #[prost(uint32, tag = "1")]
    pub extra_bits_stored: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub elems: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeeProto {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<CoinProto>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    #[prost(string, tag = "3")]
    pub payer: String,
    #[prost(string, tag = "4")]
    pub granter: String,
}

/// `cosmos.base.v1beta1.Coin`
#[derive(Clone, PartialEq, Message)]
pub struct CoinProto {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

/// `cosmos.bank.v1beta1.MsgSend`
#[derive(Clone, PartialEq, Message)]
pub struct MsgSendProto {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<CoinProto>,
}

/// `cosmos.crypto.secp256k1.PubKey`
#[derive(Clone, PartialEq, Message)]
pub struct Secp256k1PubKeyProto {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}
