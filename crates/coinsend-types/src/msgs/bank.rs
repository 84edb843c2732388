//! Bank module message types

use crate::address::AccAddress;
use crate::error::{CodecError, ValidationError};
use crate::proto::{CoinProto, MsgSendProto};
use coinsend_math::{Coin, Coins, Int};
use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MsgSend moves coins from one account to another.
///
/// Addresses are kept in their Bech32 form because that string, not the raw
/// bytes, is what ends up in the signed bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Coins,
}

impl MsgSend {
    pub const TYPE_URL: &'static str = "/cosmos.bank.v1beta1.MsgSend";
    pub const AMINO_NAME: &'static str = "cosmos-sdk/MsgSend";

    pub fn new(from_address: impl Into<String>, to_address: impl Into<String>, amount: Coins) -> Self {
        Self {
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount,
        }
    }

    pub fn validate_basic(&self, bech32_prefix: &str) -> Result<(), ValidationError> {
        let from = AccAddress::parse_with_prefix(&self.from_address, bech32_prefix)
            .map_err(|e| ValidationError::InvalidAddress(format!("sender: {e}")))?;
        let to = AccAddress::parse_with_prefix(&self.to_address, bech32_prefix)
            .map_err(|e| ValidationError::InvalidAddress(format!("receiver: {e}")))?;

        if from == to {
            return Err(ValidationError::InvalidRequest(
                "cannot send coins to the same address".to_string(),
            ));
        }

        if self.amount.is_empty() {
            return Err(ValidationError::InvalidCoins(
                "amount cannot be empty".to_string(),
            ));
        }

        for coin in &self.amount {
            if !coin.amount.is_positive() {
                return Err(ValidationError::InvalidCoins(format!(
                    "amount must be positive, got {coin}"
                )));
            }
        }

        self.amount
            .validate()
            .map_err(|e| ValidationError::InvalidCoins(e.to_string()))
    }

    pub fn signer(&self) -> Result<AccAddress, ValidationError> {
        AccAddress::from_bech32(&self.from_address)
            .map(|(_, addr)| addr)
            .map_err(|e| ValidationError::InvalidAddress(format!("sender: {e}")))
    }

    pub fn to_proto(&self) -> MsgSendProto {
        MsgSendProto {
            from_address: self.from_address.clone(),
            to_address: self.to_address.clone(),
            amount: coins_to_proto(&self.amount),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let proto = MsgSendProto::decode(bytes)?;
        Ok(Self {
            from_address: proto.from_address,
            to_address: proto.to_address,
            amount: coins_from_proto(proto.amount)?,
        })
    }

    pub(crate) fn amino_value(&self) -> Value {
        json!({
            "amount": coins_to_amino(&self.amount),
            "from_address": self.from_address,
            "to_address": self.to_address,
        })
    }
}

pub(crate) fn coins_to_proto(coins: &Coins) -> Vec<CoinProto> {
    coins
        .iter()
        .map(|coin| CoinProto {
            denom: coin.denom.clone(),
            amount: coin.amount.to_string(),
        })
        .collect()
}

/// Order is preserved so that decoding never rewrites signed bytes.
pub(crate) fn coins_from_proto(coins: Vec<CoinProto>) -> Result<Coins, CodecError> {
    coins
        .into_iter()
        .map(|coin| {
            let amount: Int = coin
                .amount
                .parse()
                .map_err(|_| CodecError::InvalidCoin(format!("{}{}", coin.amount, coin.denom)))?;
            Ok(Coin {
                denom: coin.denom,
                amount,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Coins::from_wire)
}

/// `[{"amount": "100", "denom": "stake"}]`
pub fn coins_to_amino(coins: &Coins) -> Value {
    Value::Array(
        coins
            .iter()
            .map(|coin| json!({ "amount": coin.amount.to_string(), "denom": coin.denom }))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsend_math::parse_coins;

    fn addr(seed: u8) -> String {
        AccAddress::from_pubkey(&[seed; 33])
            .to_bech32("cosmos")
            .unwrap()
    }

    #[test]
    fn test_validate_basic() {
        let msg = MsgSend::new(addr(1), addr(2), parse_coins("100stake").unwrap());
        assert!(msg.validate_basic("cosmos").is_ok());

        let same = MsgSend::new(addr(1), addr(1), parse_coins("100stake").unwrap());
        assert!(matches!(
            same.validate_basic("cosmos"),
            Err(ValidationError::InvalidRequest(_))
        ));

        let empty = MsgSend::new(addr(1), addr(2), Coins::empty());
        assert!(matches!(
            empty.validate_basic("cosmos"),
            Err(ValidationError::InvalidCoins(_))
        ));

        let bad_receiver = MsgSend::new(addr(1), "", parse_coins("1stake").unwrap());
        assert!(matches!(
            bad_receiver.validate_basic("cosmos"),
            Err(ValidationError::InvalidAddress(_))
        ));

        assert!(matches!(
            msg.validate_basic("osmo"),
            Err(ValidationError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_rejects_zero_and_negative_amounts() {
        for amount in [0, -5] {
            let coins = Coins::new(vec![Coin {
                denom: "stake".to_string(),
                amount: Int::from_i64(amount),
            }])
            .unwrap();
            let msg = MsgSend::new(addr(1), addr(2), coins);
            assert!(matches!(
                msg.validate_basic("cosmos"),
                Err(ValidationError::InvalidCoins(_))
            ));
        }
    }

    #[test]
    fn test_proto_decode() {
        let msg = MsgSend::new(addr(1), addr(2), parse_coins("5uatom,100stake").unwrap());
        let bytes = msg.to_proto().encode_to_vec();
        assert_eq!(MsgSend::decode(&bytes).unwrap(), msg);

        let bad = MsgSendProto {
            from_address: addr(1),
            to_address: addr(2),
            amount: vec![CoinProto {
                denom: "stake".to_string(),
                amount: "ten".to_string(),
            }],
        };
        assert!(matches!(
            MsgSend::decode(&bad.encode_to_vec()),
            Err(CodecError::InvalidCoin(_))
        ));
    }

    #[test]
    fn test_amino_value_keys() {
        let msg = MsgSend::new(addr(1), addr(2), parse_coins("100stake").unwrap());
        let value = msg.amino_value();
        assert_eq!(value["amount"][0]["amount"], "100");
        assert_eq!(value["amount"][0]["denom"], "stake");
        assert_eq!(value["from_address"], addr(1));
    }
}
