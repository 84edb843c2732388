//! Error types shared by message validation and the wire codec

use thiserror::Error;

/// Stateless validation failures of a message or envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failures converting between envelopes and protobuf bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("protobuf decode error: {0}")]
    Decode(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("unsupported mode info: {0}")]
    UnsupportedModeInfo(&'static str),

    #[error("unknown sign mode: {0}")]
    InvalidSignMode(i32),

    #[error("invalid coin amount: {0}")]
    InvalidCoin(String),

    #[error("signature count {signatures} does not match signer count {signers}")]
    SignatureCountMismatch { signers: usize, signatures: usize },
}

impl From<prost::DecodeError> for CodecError {
    fn from(err: prost::DecodeError) -> Self {
        CodecError::Decode(err.to_string())
    }
}
