//! Messages carried by a transaction body

pub mod bank;

use crate::address::AccAddress;
use crate::error::{CodecError, ValidationError};
use crate::proto::Any;
use bank::MsgSend;
use serde_json::Value;

/// Every message type this client can put into a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Msg {
    Send(MsgSend),
}

impl Msg {
    pub fn type_url(&self) -> &'static str {
        match self {
            Msg::Send(_) => MsgSend::TYPE_URL,
        }
    }

    pub fn validate_basic(&self, bech32_prefix: &str) -> Result<(), ValidationError> {
        match self {
            Msg::Send(msg) => msg.validate_basic(bech32_prefix),
        }
    }

    /// The single account that must sign this message.
    pub fn signer(&self) -> Result<AccAddress, ValidationError> {
        match self {
            Msg::Send(msg) => msg.signer(),
        }
    }

    pub fn to_any(&self) -> Any {
        match self {
            Msg::Send(msg) => Any::from_msg(&msg.to_proto(), MsgSend::TYPE_URL),
        }
    }

    pub fn from_any(any: &Any) -> Result<Self, CodecError> {
        match any.type_url.as_str() {
            MsgSend::TYPE_URL => MsgSend::decode(&any.value).map(Msg::Send),
            other => Err(CodecError::UnknownMessageType(other.to_string())),
        }
    }

    /// `{"type": <amino name>, "value": {...}}` as used by the legacy JSON sign mode.
    pub fn to_amino_json(&self) -> Value {
        match self {
            Msg::Send(msg) => serde_json::json!({
                "type": MsgSend::AMINO_NAME,
                "value": msg.amino_value(),
            }),
        }
    }
}

impl From<MsgSend> for Msg {
    fn from(msg: MsgSend) -> Self {
        Msg::Send(msg)
    }
}
