//! secp256k1 key wrappers

use base64::{engine::general_purpose, Engine as _};
use coinsend_types::proto::{Any, Secp256k1PubKeyProto};
use coinsend_types::AccAddress;
use k256::ecdsa::{SigningKey, VerifyingKey};
use prost::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("unsupported public key type: {0}")]
    UnsupportedKeyType(String),
}

/// Compressed secp256k1 public key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse SEC1 bytes, compressed or not.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
    }

    /// 33 byte compressed encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    pub fn to_address(&self) -> AccAddress {
        AccAddress::from_pubkey(&self.to_bytes())
    }

    pub fn type_url(&self) -> &'static str {
        SECP256K1_PUBKEY_TYPE_URL
    }

    pub fn to_any(&self) -> Any {
        Any::from_msg(
            &Secp256k1PubKeyProto {
                key: self.to_bytes(),
            },
            SECP256K1_PUBKEY_TYPE_URL,
        )
    }

    pub fn from_any(any: &Any) -> Result<Self, KeyError> {
        if any.type_url != SECP256K1_PUBKEY_TYPE_URL {
            return Err(KeyError::UnsupportedKeyType(any.type_url.clone()));
        }
        let proto = Secp256k1PubKeyProto::decode(any.value.as_slice())
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&proto.key)
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

/// secp256k1 signing key. Debug output never shows the secret.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
    }

    pub fn from_hex(hex_secret: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_secret.trim())
                .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.0.to_bytes().to_vec())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&"<redacted>").finish()
    }
}

impl From<SigningKey> for PrivateKey {
    fn from(key: SigningKey) -> Self {
        Self(key)
    }
}

#[derive(Serialize, Deserialize)]
struct PublicKeyData {
    #[serde(rename = "type")]
    key_type: String,
    value: String,
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PublicKeyData {
            key_type: self.type_url().to_string(),
            value: general_purpose::STANDARD.encode(self.to_bytes()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = PublicKeyData::deserialize(deserializer)?;
        if data.key_type != SECP256K1_PUBKEY_TYPE_URL {
            return Err(serde::de::Error::custom(format!(
                "unsupported public key type: {}",
                data.key_type
            )));
        }
        let bytes = general_purpose::STANDARD
            .decode(&data.value)
            .map_err(serde::de::Error::custom)?;
        PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}
