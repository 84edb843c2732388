//! Errors surfaced by a send

use crate::broadcast::{QueryError, TransportError};
use crate::pipeline::SendStage;
use crate::resolver::ResolveError;
use coinsend_crypto::{SignDocError, SignatureError, VerificationError};
use coinsend_types::{CodecError, ValidationError};
use std::fmt;
use thiserror::Error;

/// A failed send. No variant is retried inside the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no signing key for address {0}")]
    KeyNotFound(String),

    #[error("account query failed: {0}")]
    AccountQuery(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("transaction rejected: code({code}): {log}")]
    BroadcastRejected {
        code: u32,
        codespace: String,
        log: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("cancelled while {stage}")]
    Cancelled { stage: SendStage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    KeyNotFound,
    AccountQuery,
    Encoding,
    Signing,
    BroadcastRejected,
    Transport,
    Cancelled,
}

/// Who caused a failure, for callers mapping errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Bad input or unknown sender
    Client,
    /// The node or the network refused or could not be reached
    Network,
    Internal,
}

impl SendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SendError::Validation(_) => ErrorKind::Validation,
            SendError::KeyNotFound(_) => ErrorKind::KeyNotFound,
            SendError::AccountQuery(_) => ErrorKind::AccountQuery,
            SendError::Encoding(_) => ErrorKind::Encoding,
            SendError::Signing(_) => ErrorKind::Signing,
            SendError::BroadcastRejected { .. } => ErrorKind::BroadcastRejected,
            SendError::Transport(_) => ErrorKind::Transport,
            SendError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::KeyNotFound => "key_not_found",
            ErrorKind::AccountQuery => "account_query",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Signing => "signing",
            ErrorKind::BroadcastRejected => "broadcast_rejected",
            ErrorKind::Transport => "transport",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    pub fn origin(&self) -> ErrorOrigin {
        match self {
            ErrorKind::Validation | ErrorKind::KeyNotFound | ErrorKind::Cancelled => {
                ErrorOrigin::Client
            }
            ErrorKind::BroadcastRejected | ErrorKind::AccountQuery | ErrorKind::Transport => {
                ErrorOrigin::Network
            }
            ErrorKind::Encoding | ErrorKind::Signing => ErrorOrigin::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ValidationError> for SendError {
    fn from(err: ValidationError) -> Self {
        SendError::Validation(err.to_string())
    }
}

impl From<ResolveError> for SendError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::KeyNotFound(addr) => SendError::KeyNotFound(addr),
            ResolveError::Backend(msg) => SendError::KeyNotFound(format!("key store: {msg}")),
        }
    }
}

impl From<QueryError> for SendError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Transport(e) => SendError::Transport(e.to_string()),
            other => SendError::AccountQuery(other.to_string()),
        }
    }
}

impl From<TransportError> for SendError {
    fn from(err: TransportError) -> Self {
        SendError::Transport(err.to_string())
    }
}

impl From<SignDocError> for SendError {
    fn from(err: SignDocError) -> Self {
        SendError::Encoding(err.to_string())
    }
}

impl From<CodecError> for SendError {
    fn from(err: CodecError) -> Self {
        SendError::Encoding(err.to_string())
    }
}

impl From<SignatureError> for SendError {
    fn from(err: SignatureError) -> Self {
        SendError::Signing(err.to_string())
    }
}

impl From<VerificationError> for SendError {
    fn from(err: VerificationError) -> Self {
        SendError::Signing(err.to_string())
    }
}
