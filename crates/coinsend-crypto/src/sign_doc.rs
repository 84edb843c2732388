//! Sign bytes for SIGN_MODE_DIRECT and SIGN_MODE_LEGACY_AMINO_JSON

use coinsend_types::msgs::bank::coins_to_amino;
use coinsend_types::proto::SignDocProto;
use coinsend_types::{Msg, SignMode, UnsignedTx};
use prost::Message;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignDocError {
    #[error("envelope has no signer info")]
    MissingSignerInfo,

    #[error("expected exactly one signer, found {0}")]
    TooManySigners(usize),

    #[error("signer info has no public key")]
    MissingPublicKey,

    #[error("signer sequence {placeholder} does not match account sequence {account}")]
    SequenceMismatch { placeholder: u64, account: u64 },

    #[error("signer info declares {declared}, requested {requested}")]
    SignModeMismatch {
        declared: SignMode,
        requested: SignMode,
    },

    #[error("unsupported sign mode: {0}")]
    UnsupportedSignMode(SignMode),

    #[error("chain id is empty")]
    EmptyChainId,

    #[error("envelope has no messages")]
    NoMessages,

    #[error("amounts are not in canonical form: {0}")]
    NonCanonicalCoins(String),
}

/// Account state the sign bytes are bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Produces the exact bytes a signer signs.
///
/// Output depends only on the arguments: the direct mode is the protobuf
/// `SignDoc` over the envelope's own body and auth info encodings, the
/// legacy mode is the `StdSignDoc` rendered by [`canonical_json`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignDocCodec;

impl SignDocCodec {
    pub fn encode(
        &self,
        signer: &SignerData,
        tx: &UnsignedTx,
        mode: SignMode,
    ) -> Result<Vec<u8>, SignDocError> {
        self.check_complete(signer, tx, mode)?;

        match mode {
            SignMode::Direct => Ok(SignDocProto {
                body_bytes: tx.body_bytes(),
                auth_info_bytes: tx.auth_info_bytes(),
                chain_id: signer.chain_id.clone(),
                account_number: signer.account_number,
            }
            .encode_to_vec()),
            SignMode::LegacyAminoJson => {
                Ok(canonical_json(&self.std_sign_doc(signer, tx)).into_bytes())
            }
            other => Err(SignDocError::UnsupportedSignMode(other)),
        }
    }

    fn check_complete(
        &self,
        signer: &SignerData,
        tx: &UnsignedTx,
        mode: SignMode,
    ) -> Result<(), SignDocError> {
        if signer.chain_id.is_empty() {
            return Err(SignDocError::EmptyChainId);
        }
        if tx.body.messages.is_empty() {
            return Err(SignDocError::NoMessages);
        }

        let info = match tx.auth_info.signer_infos.as_slice() {
            [] => return Err(SignDocError::MissingSignerInfo),
            [info] => info,
            infos => return Err(SignDocError::TooManySigners(infos.len())),
        };
        if info.public_key.is_none() {
            return Err(SignDocError::MissingPublicKey);
        }
        if info.sequence != signer.sequence {
            return Err(SignDocError::SequenceMismatch {
                placeholder: info.sequence,
                account: signer.sequence,
            });
        }
        if info.mode != mode {
            return Err(SignDocError::SignModeMismatch {
                declared: info.mode,
                requested: mode,
            });
        }

        tx.auth_info
            .fee
            .amount
            .validate()
            .map_err(|e| SignDocError::NonCanonicalCoins(format!("fee: {e}")))?;
        for msg in &tx.body.messages {
            match msg {
                Msg::Send(send) => send
                    .amount
                    .validate()
                    .map_err(|e| SignDocError::NonCanonicalCoins(format!("amount: {e}")))?,
            }
        }
        Ok(())
    }

    fn std_sign_doc(&self, signer: &SignerData, tx: &UnsignedTx) -> Value {
        let fee = &tx.auth_info.fee;
        let mut fee_json = Map::new();
        fee_json.insert("amount".to_string(), coins_to_amino(&fee.amount));
        fee_json.insert("gas".to_string(), Value::String(fee.gas_limit.to_string()));
        if !fee.payer.is_empty() {
            fee_json.insert("payer".to_string(), Value::String(fee.payer.clone()));
        }
        if !fee.granter.is_empty() {
            fee_json.insert("granter".to_string(), Value::String(fee.granter.clone()));
        }

        let mut doc = json!({
            "account_number": signer.account_number.to_string(),
            "chain_id": signer.chain_id,
            "fee": Value::Object(fee_json),
            "memo": tx.body.memo,
            "msgs": tx.body.messages.iter().map(Msg::to_amino_json).collect::<Vec<_>>(),
            "sequence": signer.sequence.to_string(),
        });
        if tx.body.timeout_height != 0 {
            doc["timeout_height"] = Value::String(tx.body.timeout_height.to_string());
        }
        doc
    }
}

/// Compact JSON with `<`, `>`, `&` escaped the way Go's `encoding/json`
/// does. `serde_json::Map` is a `BTreeMap`, so object keys come out sorted.
pub fn canonical_json(value: &Value) -> String {
    let compact = value.to_string();
    let mut out = String::with_capacity(compact.len());
    // these bytes only occur inside JSON strings
    for c in compact.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::{key, ALICE, BOB};
    use coinsend_math::{parse_coins, Coin, Coins, Int};
    use coinsend_types::{AuthInfo, Fee, MsgSend, SignerInfo, TxBody};

    fn signer(sequence: u64) -> SignerData {
        SignerData {
            chain_id: "testing".to_string(),
            account_number: 5,
            sequence,
        }
    }

    fn unsigned(mode: SignMode, sequence: u64, memo: &str) -> UnsignedTx {
        let alice = key(ALICE).public_key();
        let from = alice.to_address().to_bech32("cosmos").unwrap();
        let to = key(BOB)
            .public_key()
            .to_address()
            .to_bech32("cosmos")
            .unwrap();
        UnsignedTx {
            body: TxBody {
                messages: vec![Msg::Send(MsgSend::new(
                    from,
                    to,
                    parse_coins("100stake").unwrap(),
                ))],
                memo: memo.to_string(),
                timeout_height: 0,
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo {
                    public_key: Some(alice.to_any()),
                    mode,
                    sequence,
                }],
                fee: Fee {
                    amount: parse_coins("10stake").unwrap(),
                    gas_limit: 200_000,
                    ..Default::default()
                },
            },
        }
    }

    #[test]
    fn test_direct_sign_doc_layout() {
        let tx = unsigned(SignMode::Direct, 2, "");
        let bytes = SignDocCodec
            .encode(&signer(2), &tx, SignMode::Direct)
            .unwrap();
        let doc = SignDocProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(doc.body_bytes, tx.body_bytes());
        assert_eq!(doc.auth_info_bytes, tx.auth_info_bytes());
        assert_eq!(doc.chain_id, "testing");
        assert_eq!(doc.account_number, 5);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        for mode in [SignMode::Direct, SignMode::LegacyAminoJson] {
            let a = SignDocCodec
                .encode(&signer(2), &unsigned(mode, 2, "memo"), mode)
                .unwrap();
            let b = SignDocCodec
                .encode(&signer(2), &unsigned(mode, 2, "memo"), mode)
                .unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_sequence_changes_sign_bytes() {
        for mode in [SignMode::Direct, SignMode::LegacyAminoJson] {
            let a = SignDocCodec
                .encode(&signer(2), &unsigned(mode, 2, ""), mode)
                .unwrap();
            let b = SignDocCodec
                .encode(&signer(3), &unsigned(mode, 3, ""), mode)
                .unwrap();
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_amino_json_document() {
        let tx = unsigned(SignMode::LegacyAminoJson, 2, "a<b");
        let bytes = SignDocCodec
            .encode(&signer(2), &tx, SignMode::LegacyAminoJson)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let Msg::Send(msg) = &tx.body.messages[0];
        let expected = format!(
            concat!(
                r#"{{"account_number":"5","chain_id":"testing","#,
                r#""fee":{{"amount":[{{"amount":"10","denom":"stake"}}],"gas":"200000"}},"#,
                r#""memo":"a\u003cb","#,
                r#""msgs":[{{"type":"cosmos-sdk/MsgSend","value":{{"amount":[{{"amount":"100","denom":"stake"}}],"from_address":"{}","to_address":"{}"}}}}],"#,
                r#""sequence":"2"}}"#
            ),
            msg.from_address, msg.to_address
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_incomplete_envelope() {
        let mut tx = unsigned(SignMode::Direct, 2, "");
        tx.auth_info.signer_infos[0].public_key = None;
        assert_eq!(
            SignDocCodec.encode(&signer(2), &tx, SignMode::Direct),
            Err(SignDocError::MissingPublicKey)
        );

        tx.auth_info.signer_infos.clear();
        assert_eq!(
            SignDocCodec.encode(&signer(2), &tx, SignMode::Direct),
            Err(SignDocError::MissingSignerInfo)
        );

        let tx = unsigned(SignMode::Direct, 1, "");
        assert_eq!(
            SignDocCodec.encode(&signer(2), &tx, SignMode::Direct),
            Err(SignDocError::SequenceMismatch {
                placeholder: 1,
                account: 2
            })
        );

        assert!(matches!(
            SignDocCodec.encode(&signer(1), &tx, SignMode::LegacyAminoJson),
            Err(SignDocError::SignModeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_unsorted_amounts() {
        let mut tx = unsigned(SignMode::Direct, 2, "");
        tx.auth_info.fee.amount = Coins::from_wire(vec![
            Coin::new("uatom", Int::from_u64(1)).unwrap(),
            Coin::new("stake", Int::from_u64(1)).unwrap(),
        ]);
        assert!(matches!(
            SignDocCodec.encode(&signer(2), &tx, SignMode::Direct),
            Err(SignDocError::NonCanonicalCoins(_))
        ));
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"z": 1, "a": [true, null]}, "a": "x&y"});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":"x\u0026y","b":{"a":[true,null],"z":1}}"#
        );
    }
}
