//! Account addresses

use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_BECH32_PREFIX: &str = "cosmos";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")]
    Empty,

    #[error("invalid bech32: {0}")]
    Bech32(String),

    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),

    #[error("address prefix mismatch: expected {expected}, got {actual}")]
    PrefixMismatch { expected: String, actual: String },
}

/// Account address - 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccAddress([u8; 20]);

impl AccAddress {
    /// Derive an address from a compressed secp256k1 public key:
    /// ripemd160(sha256(pubkey_bytes))
    pub fn from_pubkey(pubkey_bytes: &[u8]) -> Self {
        let sha256_hash = Sha256::digest(pubkey_bytes);
        let ripemd160_hash = Ripemd160::digest(sha256_hash);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&ripemd160_hash);
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    pub fn to_bech32(&self, prefix: &str) -> Result<String, AddressError> {
        let hrp = Hrp::parse(prefix).map_err(|e| AddressError::Bech32(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.0).map_err(|e| AddressError::Bech32(e.to_string()))
    }

    /// Parse from Bech32, returning the human readable prefix alongside.
    pub fn from_bech32(s: &str) -> Result<(String, Self), AddressError> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let (hrp, data) = bech32::decode(s).map_err(|e| AddressError::Bech32(e.to_string()))?;
        Ok((hrp.to_string(), Self::from_bytes(&data)?))
    }

    /// Parse a Bech32 address that must carry `prefix`.
    pub fn parse_with_prefix(s: &str, prefix: &str) -> Result<Self, AddressError> {
        let (hrp, addr) = Self::from_bech32(s)?;
        if hrp != prefix {
            return Err(AddressError::PrefixMismatch {
                expected: prefix.to_string(),
                actual: hrp,
            });
        }
        Ok(addr)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

/// Hex form, used in logs where the network prefix is not at hand.
impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bech32_round_trip() {
        let addr = AccAddress::from_pubkey(&[2u8; 33]);
        let encoded = addr.to_bech32("cosmos").unwrap();
        assert!(encoded.starts_with("cosmos1"));

        let (hrp, decoded) = AccAddress::from_bech32(&encoded).unwrap();
        assert_eq!(hrp, "cosmos");
        assert_eq!(decoded, addr);
        assert_eq!(
            AccAddress::parse_with_prefix(&encoded, "cosmos").unwrap(),
            addr
        );
    }

    #[test]
    fn test_prefix_mismatch() {
        let encoded = AccAddress::from_pubkey(&[3u8; 33])
            .to_bech32("osmo")
            .unwrap();
        assert!(matches!(
            AccAddress::parse_with_prefix(&encoded, "cosmos"),
            Err(AddressError::PrefixMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(AccAddress::from_bech32(""), Err(AddressError::Empty));
        assert!(matches!(
            AccAddress::from_bech32("cosmos1invalid"),
            Err(AddressError::Bech32(_))
        ));
        assert_eq!(
            AccAddress::from_bytes(&[0u8; 32]),
            Err(AddressError::InvalidLength(32))
        );
    }
}
