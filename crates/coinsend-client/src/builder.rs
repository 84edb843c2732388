//! Building unsigned transfer envelopes

use crate::error::SendError;
use coinsend_crypto::PublicKey;
use coinsend_math::{is_valid_denom, Coin, Coins};
use coinsend_types::{
    AccAddress, AuthInfo, Fee, MsgSend, SignMode, SignerInfo, TxBody, UnsignedTx,
};
use serde::{Deserialize, Serialize};

/// A transfer as requested by a caller, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Vec<Coin>,
    #[serde(default)]
    pub fee: Vec<Coin>,
    pub gas_limit: u64,
    pub chain_id: String,
    #[serde(default)]
    pub memo: Option<String>,
}

impl TransferRequest {
    /// The bank message this request asks for. Amounts are put in canonical
    /// order; duplicates are rejected.
    pub fn to_msg(&self) -> Result<MsgSend, SendError> {
        let amount = Coins::new(self.amount.clone())
            .map_err(|e| SendError::Validation(format!("amount: {e}")))?;
        Ok(MsgSend::new(&self.sender, &self.receiver, amount))
    }

    pub fn fee_coins(&self) -> Result<Coins, SendError> {
        Coins::normalized(self.fee.clone()).map_err(|e| SendError::Validation(format!("fee: {e}")))
    }

    pub fn memo(&self) -> &str {
        self.memo.as_deref().unwrap_or_default()
    }
}

/// Signer metadata known before the signature exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerPlaceholder {
    /// Key whose address must equal the message sender
    pub public_key: PublicKey,
    /// Sequence the signature will be bound to
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Prefix both addresses must carry
    pub bech32_prefix: String,
    /// Mode recorded in the signer placeholder
    pub sign_mode: SignMode,
    /// Denominations the network accepts. Empty accepts any valid denom.
    pub denoms: Vec<String>,
    /// Memo limit in UTF-8 bytes, as the node counts it
    pub max_memo_bytes: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            bech32_prefix: coinsend_types::address::DEFAULT_BECH32_PREFIX.to_string(),
            sign_mode: SignMode::Direct,
            denoms: Vec::new(),
            max_memo_bytes: 256,
        }
    }
}

/// Turns a message, fee and signer placeholder into an [`UnsignedTx`].
///
/// Pure: no I/O, and the same inputs always give the same envelope.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    config: BuilderConfig,
}

impl TransactionBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Structural checks on everything except the signer.
    pub fn validate(
        &self,
        msg: &MsgSend,
        fee: &Coins,
        gas_limit: u64,
        chain_id: &str,
        memo: &str,
    ) -> Result<(), SendError> {
        msg.validate_basic(&self.config.bech32_prefix)?;

        for coin in msg.amount.iter() {
            self.check_denom(&coin.denom)?;
        }
        for coin in fee.iter() {
            if coin.amount.is_negative() {
                return Err(SendError::Validation(format!("negative fee: {coin}")));
            }
            self.check_denom(&coin.denom)?;
        }

        if gas_limit == 0 {
            return Err(SendError::Validation("gas limit must be positive".to_string()));
        }
        if chain_id.trim().is_empty() {
            return Err(SendError::Validation("chain id is empty".to_string()));
        }
        // the node's memo limit counts bytes, not characters
        if memo.len() > self.config.max_memo_bytes {
            return Err(SendError::Validation(format!(
                "memo is {} bytes, limit is {}",
                memo.len(),
                self.config.max_memo_bytes
            )));
        }
        Ok(())
    }

    pub fn build(
        &self,
        msg: MsgSend,
        fee: Coins,
        gas_limit: u64,
        chain_id: &str,
        memo: &str,
        signer: SignerPlaceholder,
    ) -> Result<UnsignedTx, SendError> {
        self.validate(&msg, &fee, gas_limit, chain_id, memo)?;

        let sender = AccAddress::parse_with_prefix(&msg.from_address, &self.config.bech32_prefix)
            .map_err(|e| SendError::Validation(e.to_string()))?;
        if signer.public_key.to_address() != sender {
            return Err(SendError::Validation(format!(
                "signer public key does not derive sender {}",
                msg.from_address
            )));
        }

        let fee = Coins::normalized(fee.into_vec())
            .map_err(|e| SendError::Validation(format!("fee: {e}")))?;

        Ok(UnsignedTx {
            body: TxBody {
                messages: vec![msg.into()],
                memo: memo.to_string(),
                timeout_height: 0,
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo {
                    public_key: Some(signer.public_key.to_any()),
                    mode: self.config.sign_mode,
                    sequence: signer.sequence,
                }],
                fee: Fee {
                    amount: fee,
                    gas_limit,
                    payer: String::new(),
                    granter: String::new(),
                },
            },
        })
    }

    fn check_denom(&self, denom: &str) -> Result<(), SendError> {
        if !is_valid_denom(denom) {
            return Err(SendError::Validation(format!("invalid denomination: {denom}")));
        }
        if self.config.denoms.is_empty() || self.config.denoms.iter().any(|d| d == denom) {
            Ok(())
        } else {
            Err(SendError::Validation(format!(
                "denomination {denom} is not accepted by this network"
            )))
        }
    }
}
