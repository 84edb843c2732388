//! Transaction envelopes and their wire encoding

use crate::error::CodecError;
use crate::msgs::bank::{coins_from_proto, coins_to_proto};
use crate::msgs::Msg;
use crate::proto::{
    mode_info_proto, Any, AuthInfoProto, FeeProto, ModeInfoProto, ModeInfoSingleProto, SignMode,
    SignerInfoProto, TxBodyProto, TxRawProto,
};
use coinsend_math::Coins;
use prost::Message;
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TxBody {
    pub messages: Vec<Msg>,
    pub memo: String,
    pub timeout_height: u64,
}

/// Signer metadata. Before signing this is the placeholder the sign bytes
/// are computed over; the signature itself travels separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerInfo {
    /// `/cosmos.crypto.secp256k1.PubKey` packed in an Any
    pub public_key: Option<Any>,
    pub mode: SignMode,
    pub sequence: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Fee {
    pub amount: Coins,
    pub gas_limit: u64,
    pub payer: String,
    pub granter: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

/// A transaction whose signer metadata is filled in but which carries no
/// signatures yet.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct UnsignedTx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
}

impl UnsignedTx {
    pub fn body_bytes(&self) -> Vec<u8> {
        TxBodyProto::from(&self.body).encode_to_vec()
    }

    pub fn auth_info_bytes(&self) -> Vec<u8> {
        AuthInfoProto::from(&self.auth_info).encode_to_vec()
    }
}

/// An envelope plus one signature per signer info, in the same order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTx {
    pub tx: UnsignedTx,
    pub signatures: Vec<Vec<u8>>,
}

impl From<&TxBody> for TxBodyProto {
    fn from(body: &TxBody) -> Self {
        TxBodyProto {
            messages: body.messages.iter().map(Msg::to_any).collect(),
            memo: body.memo.clone(),
            timeout_height: body.timeout_height,
            extension_options: vec![],
            non_critical_extension_options: vec![],
        }
    }
}

impl From<&AuthInfo> for AuthInfoProto {
    fn from(auth_info: &AuthInfo) -> Self {
        AuthInfoProto {
            signer_infos: auth_info
                .signer_infos
                .iter()
                .map(|info| SignerInfoProto {
                    public_key: info.public_key.clone(),
                    mode_info: Some(ModeInfoProto {
                        sum: Some(mode_info_proto::Sum::Single(ModeInfoSingleProto {
                            mode: info.mode as i32,
                        })),
                    }),
                    sequence: info.sequence,
                })
                .collect(),
            fee: Some(FeeProto {
                amount: coins_to_proto(&auth_info.fee.amount),
                gas_limit: auth_info.fee.gas_limit,
                payer: auth_info.fee.payer.clone(),
                granter: auth_info.fee.granter.clone(),
            }),
        }
    }
}

fn decode_body(bytes: &[u8]) -> Result<TxBody, CodecError> {
    let proto = TxBodyProto::decode(bytes)?;
    if !proto.extension_options.is_empty() || !proto.non_critical_extension_options.is_empty() {
        return Err(CodecError::UnknownMessageType(
            "extension options are not supported".to_string(),
        ));
    }
    Ok(TxBody {
        messages: proto
            .messages
            .iter()
            .map(Msg::from_any)
            .collect::<Result<_, _>>()?,
        memo: proto.memo,
        timeout_height: proto.timeout_height,
    })
}

fn decode_auth_info(bytes: &[u8]) -> Result<AuthInfo, CodecError> {
    let proto = AuthInfoProto::decode(bytes)?;

    let signer_infos = proto
        .signer_infos
        .into_iter()
        .map(|info| {
            let mode = match info.mode_info.and_then(|m| m.sum) {
                Some(mode_info_proto::Sum::Single(single)) => SignMode::try_from(single.mode)
                    .map_err(|_| CodecError::InvalidSignMode(single.mode))?,
                Some(mode_info_proto::Sum::Multi(_)) => {
                    return Err(CodecError::UnsupportedModeInfo("multi"))
                }
                None => return Err(CodecError::MissingField("mode_info")),
            };
            Ok(SignerInfo {
                public_key: info.public_key,
                mode,
                sequence: info.sequence,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let fee = proto.fee.ok_or(CodecError::MissingField("fee"))?;
    Ok(AuthInfo {
        signer_infos,
        fee: Fee {
            amount: coins_from_proto(fee.amount)?,
            gas_limit: fee.gas_limit,
            payer: fee.payer,
            granter: fee.granter,
        },
    })
}

/// Serializes signed envelopes to the `TxRaw` bytes accepted by
/// `broadcast_tx_sync`, and back.
///
/// `body_bytes` and `auth_info_bytes` are produced by the same encoding the
/// sign doc uses, so the broadcast transaction differs from the signed bytes
/// only in its signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxEncoder;

impl TxEncoder {
    pub fn encode(&self, tx: &SignedTx) -> Result<Vec<u8>, CodecError> {
        let signers = tx.tx.auth_info.signer_infos.len();
        if signers == 0 || signers != tx.signatures.len() {
            return Err(CodecError::SignatureCountMismatch {
                signers,
                signatures: tx.signatures.len(),
            });
        }

        let raw = TxRawProto {
            body_bytes: tx.tx.body_bytes(),
            auth_info_bytes: tx.tx.auth_info_bytes(),
            signatures: tx.signatures.clone(),
        };
        Ok(raw.encode_to_vec())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<SignedTx, CodecError> {
        let raw = TxRawProto::decode(bytes)?;
        if raw.body_bytes.is_empty() {
            return Err(CodecError::MissingField("body_bytes"));
        }
        if raw.auth_info_bytes.is_empty() {
            return Err(CodecError::MissingField("auth_info_bytes"));
        }

        let tx = SignedTx {
            tx: UnsignedTx {
                body: decode_body(&raw.body_bytes)?,
                auth_info: decode_auth_info(&raw.auth_info_bytes)?,
            },
            signatures: raw.signatures,
        };

        if tx.tx.auth_info.signer_infos.len() != tx.signatures.len() {
            return Err(CodecError::SignatureCountMismatch {
                signers: tx.tx.auth_info.signer_infos.len(),
                signatures: tx.signatures.len(),
            });
        }
        Ok(tx)
    }

    /// CometBFT transaction hash: uppercase hex SHA-256 of the wire bytes.
    pub fn tx_hash(&self, tx_bytes: &[u8]) -> String {
        hex::encode_upper(Sha256::digest(tx_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AccAddress;
    use crate::msgs::bank::MsgSend;
    use crate::proto::Secp256k1PubKeyProto;
    use coinsend_math::{parse_coins, Coin, Int};
    use proptest::prelude::*;

    fn addr(seed: u8) -> String {
        AccAddress::from_pubkey(&[seed; 33])
            .to_bech32("cosmos")
            .unwrap()
    }

    fn pubkey_any() -> Any {
        Any::from_msg(
            &Secp256k1PubKeyProto { key: vec![2u8; 33] },
            "/cosmos.crypto.secp256k1.PubKey",
        )
    }

    fn sample_tx(amount: u64, memo: &str, sequence: u64) -> SignedTx {
        let msg = MsgSend::new(
            addr(1),
            addr(2),
            Coins::new(vec![Coin::new("stake", Int::from_u64(amount)).unwrap()]).unwrap(),
        );
        SignedTx {
            tx: UnsignedTx {
                body: TxBody {
                    messages: vec![Msg::Send(msg)],
                    memo: memo.to_string(),
                    timeout_height: 0,
                },
                auth_info: AuthInfo {
                    signer_infos: vec![SignerInfo {
                        public_key: Some(pubkey_any()),
                        mode: SignMode::Direct,
                        sequence,
                    }],
                    fee: Fee {
                        amount: parse_coins("10stake").unwrap(),
                        gas_limit: 200_000,
                        payer: String::new(),
                        granter: String::new(),
                    },
                },
            },
            signatures: vec![vec![7u8; 64]],
        }
    }

    #[test]
    fn test_encode_decode() {
        let tx = sample_tx(100, "hello", 2);
        let bytes = TxEncoder.encode(&tx).unwrap();
        assert_eq!(TxEncoder.decode(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_encoded_parts_match_sign_inputs() {
        let tx = sample_tx(100, "", 2);
        let bytes = TxEncoder.encode(&tx).unwrap();
        let raw = TxRawProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(raw.body_bytes, tx.tx.body_bytes());
        assert_eq!(raw.auth_info_bytes, tx.tx.auth_info_bytes());
        assert_eq!(raw.signatures, tx.signatures);
    }

    #[test]
    fn test_encode_requires_signature() {
        let mut tx = sample_tx(1, "", 0);
        tx.signatures.clear();
        assert_eq!(
            TxEncoder.encode(&tx),
            Err(CodecError::SignatureCountMismatch {
                signers: 1,
                signatures: 0
            })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_message() {
        let body = TxBodyProto {
            messages: vec![Any {
                type_url: "/cosmos.staking.v1beta1.MsgDelegate".to_string(),
                value: vec![],
            }],
            memo: String::new(),
            timeout_height: 0,
            extension_options: vec![],
            non_critical_extension_options: vec![],
        };
        let raw = TxRawProto {
            body_bytes: body.encode_to_vec(),
            auth_info_bytes: sample_tx(1, "", 0).tx.auth_info_bytes(),
            signatures: vec![vec![1]],
        };
        assert!(matches!(
            TxEncoder.decode(&raw.encode_to_vec()),
            Err(CodecError::UnknownMessageType(_))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(TxEncoder.decode(&[0xff, 0xff, 0xff]).is_err());
        assert!(matches!(
            TxEncoder.decode(&[]),
            Err(CodecError::MissingField("body_bytes"))
        ));
    }

    #[test]
    fn test_tx_hash_format() {
        let hash = TxEncoder.tx_hash(b"tx");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash.to_uppercase());
    }

    proptest! {
        #[test]
        fn prop_wire_round_trip(amount in 1u64.., memo in "[ -~]{0,64}", sequence in any::<u64>()) {
            let tx = sample_tx(amount, &memo, sequence);
            let bytes = TxEncoder.encode(&tx).unwrap();
            prop_assert_eq!(TxEncoder.decode(&bytes).unwrap(), tx);
        }
    }
}
