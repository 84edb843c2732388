//! Deterministic secp256k1 signing

use crate::keys::{PrivateKey, PublicKey};
use k256::ecdsa::Signature;
use signature::{Signer, Verifier};
use thiserror::Error;

/// Length of a compact `r || s` signature
pub const SIGNATURE_LENGTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    VerificationFailed,
}

/// Sign `message` with ECDSA over its SHA-256 digest.
///
/// Nonces follow RFC 6979, so the same key and message always give the same
/// signature. The result is normalized to low-S as the SDK ante handler
/// requires.
pub fn sign_message(key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let signature: Signature = key
        .signing_key()
        .try_sign(message)
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;
    let signature = signature.normalize_s().unwrap_or(signature);
    Ok(signature.to_bytes().to_vec())
}

pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }
    let signature = Signature::from_slice(signature)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
    if signature.normalize_s().is_some() {
        return Err(SignatureError::InvalidSignature(
            "signature is not in low-S form".to_string(),
        ));
    }

    public_key
        .verifying_key()
        .verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::{key, ALICE, BOB};

    #[test]
    fn test_sign_and_verify() {
        let alice = key(ALICE);
        let sig = sign_message(&alice, b"sign bytes").unwrap();
        assert_eq!(sig.len(), SIGNATURE_LENGTH);
        assert!(verify_signature(&alice.public_key(), b"sign bytes", &sig).is_ok());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let alice = key(ALICE);
        let a = sign_message(&alice, b"payload").unwrap();
        let b = sign_message(&alice, b"payload").unwrap();
        let c = sign_message(&alice, b"payload2").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_wrong_key_or_message_fails() {
        let sig = sign_message(&key(ALICE), b"payload").unwrap();
        assert_eq!(
            verify_signature(&key(BOB).public_key(), b"payload", &sig),
            Err(SignatureError::VerificationFailed)
        );
        assert_eq!(
            verify_signature(&key(ALICE).public_key(), b"other", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn test_malformed_signature() {
        let pk = key(ALICE).public_key();
        assert!(matches!(
            verify_signature(&pk, b"payload", &[1u8; 10]),
            Err(SignatureError::InvalidSignature(_))
        ));
    }
}
