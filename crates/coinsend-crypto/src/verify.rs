//! Signature verification of assembled transactions

use crate::keys::PublicKey;
use crate::sign_doc::{SignDocCodec, SignerData};
use crate::signature::verify_signature;
use coinsend_types::SignedTx;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("public key mismatch: expected {expected}, got {actual}")]
    PublicKeyMismatch { expected: String, actual: String },

    #[error("invalid sign doc: {0}")]
    InvalidSignDoc(String),

    #[error("missing signature")]
    MissingSignature,

    #[error("only single-signer transactions are supported, found {0} signers")]
    UnsupportedSigners(usize),

    #[error("signature verification failed for address: {0}")]
    SignatureVerificationFailed(String),

    #[error("invalid account sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}

/// Checks a signed transaction the way a node's ante handler would for a
/// single secp256k1 signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionVerifier {
    codec: SignDocCodec,
}

impl TransactionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify(&self, tx: &SignedTx, signer: &SignerData) -> Result<(), VerificationError> {
        let infos = &tx.tx.auth_info.signer_infos;
        if infos.len() != 1 {
            return Err(VerificationError::UnsupportedSigners(infos.len()));
        }
        let info = &infos[0];
        let signature = tx
            .signatures
            .first()
            .ok_or(VerificationError::MissingSignature)?;

        let any = info
            .public_key
            .as_ref()
            .ok_or_else(|| VerificationError::InvalidSignDoc("missing public key".to_string()))?;
        let public_key = PublicKey::from_any(any)
            .map_err(|e| VerificationError::InvalidSignDoc(e.to_string()))?;
        let derived = public_key.to_address();

        for msg in &tx.tx.body.messages {
            let expected = msg
                .signer()
                .map_err(|e| VerificationError::InvalidSignDoc(e.to_string()))?;
            if expected != derived {
                return Err(VerificationError::PublicKeyMismatch {
                    expected: expected.to_string(),
                    actual: derived.to_string(),
                });
            }
        }

        if info.sequence != signer.sequence {
            return Err(VerificationError::InvalidSequence {
                expected: signer.sequence,
                actual: info.sequence,
            });
        }

        let sign_bytes = self
            .codec
            .encode(signer, &tx.tx, info.mode)
            .map_err(|e| VerificationError::InvalidSignDoc(e.to_string()))?;

        verify_signature(&public_key, &sign_bytes, signature)
            .map_err(|_| VerificationError::SignatureVerificationFailed(derived.to_string()))
    }
}
