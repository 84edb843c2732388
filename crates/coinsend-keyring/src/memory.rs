//! In-memory key store

use crate::{hd, validate_name, KeyInfo, KeyStore, KeyWriter, KeyringError};
use async_trait::async_trait;
use coinsend_crypto::PrivateKey;
use coinsend_types::AccAddress;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use zeroize::Zeroizing;

/// Keys held only for the life of the process
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<BTreeMap<String, (KeyInfo, PrivateKey)>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, key: PrivateKey) -> Result<KeyInfo, KeyringError> {
        validate_name(name)?;
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        if keys.contains_key(name) {
            return Err(KeyringError::KeyExists(name.to_string()));
        }
        let info = KeyInfo::from_private_key(name, &key);
        keys.insert(name.to_string(), (info.clone(), key));
        Ok(info)
    }
}

impl KeyStore for MemoryKeyStore {
    fn key_by_address(&self, address: &AccAddress) -> Result<PrivateKey, KeyringError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.values()
            .find(|(info, _)| info.address == *address)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| KeyringError::KeyNotFound(address.to_string()))
    }

    fn key_by_name(&self, name: &str) -> Result<PrivateKey, KeyringError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.get(name)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| KeyringError::KeyNotFound(name.to_string()))
    }

    fn list(&self) -> Vec<KeyInfo> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.values().map(|(info, _)| info.clone()).collect()
    }
}

#[async_trait]
impl KeyWriter for MemoryKeyStore {
    async fn create_key(&self, name: &str) -> Result<(KeyInfo, Zeroizing<String>), KeyringError> {
        let mnemonic = hd::generate_mnemonic()?;
        let phrase = Zeroizing::new(mnemonic.to_string());
        let key = hd::derive_private_key_from_mnemonic(&phrase, None)?;
        Ok((self.insert(name, key)?, phrase))
    }

    async fn import_mnemonic(&self, name: &str, mnemonic: &str) -> Result<KeyInfo, KeyringError> {
        let key = hd::derive_private_key_from_mnemonic(mnemonic, None)?;
        self.insert(name, key)
    }
}
