//! Key storage for coinsend
//!
//! A [`KeyStore`] answers "which private key signs for this address". Lookups
//! are read-only and safe to call from many tasks at once. Stores that can
//! also mint keys implement [`KeyWriter`].

pub mod file;
pub mod hd;
pub mod memory;

use async_trait::async_trait;
use coinsend_crypto::{PrivateKey, PublicKey};
use coinsend_types::AccAddress;
use thiserror::Error;
use zeroize::Zeroizing;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyringError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("key already exists: {0}")]
    KeyExists(String),

    #[error("invalid key name: {0}")]
    InvalidName(String),

    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("backend error: {0}")]
    BackendError(String),
}

/// Public description of a stored key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
    pub address: AccAddress,
    pub pubkey: PublicKey,
}

impl KeyInfo {
    pub fn from_private_key(name: &str, key: &PrivateKey) -> Self {
        let pubkey = key.public_key();
        Self {
            name: name.to_string(),
            address: pubkey.to_address(),
            pubkey,
        }
    }
}

pub trait KeyStore: Send + Sync {
    fn key_by_address(&self, address: &AccAddress) -> Result<PrivateKey, KeyringError>;

    fn key_by_name(&self, name: &str) -> Result<PrivateKey, KeyringError>;

    /// All keys, sorted by name.
    fn list(&self) -> Vec<KeyInfo>;
}

#[async_trait]
pub trait KeyWriter: KeyStore {
    /// Generate a fresh 24 word mnemonic, derive the default Cosmos key from
    /// it and store it under `name`. The mnemonic is returned once so the
    /// caller can hand it to the user for backup.
    async fn create_key(&self, name: &str) -> Result<(KeyInfo, Zeroizing<String>), KeyringError>;

    async fn import_mnemonic(&self, name: &str, mnemonic: &str) -> Result<KeyInfo, KeyringError>;
}

pub(crate) fn validate_name(name: &str) -> Result<(), KeyringError> {
    let ok = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(KeyringError::InvalidName(name.to_string()))
    }
}
