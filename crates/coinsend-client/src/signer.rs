//! Signing sign bytes and assembling the signed envelope

use crate::error::SendError;
use coinsend_crypto::{sign_message, verify_signature, PrivateKey, PublicKey};
use coinsend_crypto::signature::SIGNATURE_LENGTH;
use coinsend_types::{SignMode, SignedTx, UnsignedTx};

/// A signature together with the metadata it was produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSignature {
    pub public_key: PublicKey,
    pub sign_mode: SignMode,
    pub signature: Vec<u8>,
}

/// secp256k1 signing with RFC 6979 nonces.
///
/// Signing happens in two steps. The envelope is first built with a signer
/// placeholder and sign bytes are computed over it; [`Signer::sign`] signs
/// those bytes and [`Signer::assemble`] attaches the signature without
/// touching anything that was signed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signer;

impl Signer {
    pub fn new() -> Self {
        Self
    }

    /// Sign `sign_doc` and check the result against the key's own public key.
    pub fn sign(&self, key: &PrivateKey, sign_doc: &[u8]) -> Result<Vec<u8>, SendError> {
        let signature = sign_message(key, sign_doc)?;
        verify_signature(&key.public_key(), sign_doc, &signature)?;
        Ok(signature)
    }

    pub fn sign_with_mode(
        &self,
        key: &PrivateKey,
        sign_mode: SignMode,
        sign_doc: &[u8],
    ) -> Result<TxSignature, SendError> {
        Ok(TxSignature {
            public_key: key.public_key(),
            sign_mode,
            signature: self.sign(key, sign_doc)?,
        })
    }

    /// Attach `signature` to the envelope it was computed over.
    ///
    /// The placeholder must already name the same public key and sign mode;
    /// otherwise the node would verify against different bytes.
    pub fn assemble(&self, tx: UnsignedTx, signature: TxSignature) -> Result<SignedTx, SendError> {
        let infos = &tx.auth_info.signer_infos;
        if infos.len() != 1 {
            return Err(SendError::Signing(format!(
                "expected exactly one signer, envelope has {}",
                infos.len()
            )));
        }
        let info = &infos[0];

        if info.public_key.as_ref() != Some(&signature.public_key.to_any()) {
            return Err(SendError::Signing(
                "signature public key does not match the signer placeholder".to_string(),
            ));
        }
        if info.mode != signature.sign_mode {
            return Err(SendError::Signing(format!(
                "signature produced under {}, placeholder declares {}",
                signature.sign_mode, info.mode
            )));
        }
        if signature.signature.len() != SIGNATURE_LENGTH {
            return Err(SendError::Signing(format!(
                "signature is {} bytes, expected {SIGNATURE_LENGTH}",
                signature.signature.len()
            )));
        }

        Ok(SignedTx {
            tx,
            signatures: vec![signature.signature],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsend_crypto::{SignDocCodec, SignerData};
    use coinsend_math::parse_coins;
    use coinsend_types::{AuthInfo, Fee, MsgSend, SignerInfo, TxBody};

    const ALICE: &str = "1e99423a4ed27608a15a2616a2b0e9e52ced330ac530edcc32c8ffc6a526aedd";
    const BOB: &str = "c87509a1c067bbde78beb793e6fa76530b6382a4c0241e5e4a9ec0a0f44dc0d3";

    fn key(secret: &str) -> PrivateKey {
        PrivateKey::from_hex(secret).unwrap()
    }

    fn unsigned(mode: SignMode) -> UnsignedTx {
        let alice = key(ALICE).public_key();
        UnsignedTx {
            body: TxBody {
                messages: vec![MsgSend::new(
                    alice.to_address().to_bech32("cosmos").unwrap(),
                    key(BOB).public_key().to_address().to_bech32("cosmos").unwrap(),
                    parse_coins("100stake").unwrap(),
                )
                .into()],
                ..Default::default()
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo {
                    public_key: Some(alice.to_any()),
                    mode,
                    sequence: 0,
                }],
                fee: Fee {
                    gas_limit: 100_000,
                    ..Default::default()
                },
            },
        }
    }

    fn signer_data() -> SignerData {
        SignerData {
            chain_id: "testing".to_string(),
            account_number: 1,
            sequence: 0,
        }
    }

    #[test]
    fn test_deterministic_signature() {
        let tx = unsigned(SignMode::Direct);
        let bytes = SignDocCodec.encode(&signer_data(), &tx, SignMode::Direct).unwrap();
        let first = Signer.sign(&key(ALICE), &bytes).unwrap();
        let second = Signer.sign(&key(ALICE), &bytes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), SIGNATURE_LENGTH);
    }

    #[test]
    fn test_assemble_keeps_signed_parts() {
        let tx = unsigned(SignMode::Direct);
        let bytes = SignDocCodec.encode(&signer_data(), &tx, SignMode::Direct).unwrap();
        let sig = Signer
            .sign_with_mode(&key(ALICE), SignMode::Direct, &bytes)
            .unwrap();

        let signed = Signer.assemble(tx.clone(), sig.clone()).unwrap();
        assert_eq!(signed.tx, tx);
        assert_eq!(signed.signatures, vec![sig.signature]);

        // re-deriving sign bytes from the assembled envelope gives the same bytes
        let again = SignDocCodec
            .encode(&signer_data(), &signed.tx, SignMode::Direct)
            .unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_assemble_rejects_foreign_key() {
        let tx = unsigned(SignMode::Direct);
        let bytes = SignDocCodec.encode(&signer_data(), &tx, SignMode::Direct).unwrap();
        let sig = Signer.sign_with_mode(&key(BOB), SignMode::Direct, &bytes).unwrap();
        assert!(matches!(
            Signer.assemble(tx, sig),
            Err(SendError::Signing(_))
        ));
    }

    #[test]
    fn test_assemble_rejects_mode_mismatch() {
        let tx = unsigned(SignMode::LegacyAminoJson);
        let sig = Signer
            .sign_with_mode(&key(ALICE), SignMode::Direct, b"anything")
            .unwrap();
        assert!(matches!(
            Signer.assemble(tx, sig),
            Err(SendError::Signing(_))
        ));
    }
}
