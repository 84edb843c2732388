//! Directory-backed key store.
//!
//! Each key lives in `<dir>/<name>.json`. The secret is sealed with
//! AES-256-GCM under a key stretched from the store password with Argon2;
//! the address and public key are stored in the clear so listings do not
//! need the password.

use crate::{hd, validate_name, KeyInfo, KeyStore, KeyWriter, KeyringError};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::Argon2;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use coinsend_crypto::{PrivateKey, PublicKey};
use coinsend_types::AccAddress;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::fs;
use tracing::{debug, warn};
use zeroize::Zeroizing;

const KEY_TYPE: &str = "secp256k1";
const SALT_LEN: usize = 16;

#[derive(Serialize, Deserialize)]
struct EncryptedKeyFile {
    name: String,
    key_type: String,
    /// base64 ciphertext
    encrypted_data: String,
    /// base64
    nonce: String,
    /// base64
    salt: String,
    pubkey: PublicKey,
    /// hex, independent of any bech32 prefix
    address: String,
}

pub struct FileKeyStore {
    dir: PathBuf,
    password: Zeroizing<String>,
    keys: RwLock<BTreeMap<String, (KeyInfo, PrivateKey)>>,
}

impl FileKeyStore {
    /// Open (creating if needed) the store in `dir` and decrypt every key file
    /// in it. Files that cannot be read or decrypted are skipped with a
    /// warning.
    pub async fn open(dir: impl AsRef<Path>, password: String) -> Result<Self, KeyringError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            KeyringError::BackendError(format!("failed to create keyring directory: {e}"))
        })?;

        let store = Self {
            dir,
            password: Zeroizing::new(password),
            keys: RwLock::new(BTreeMap::new()),
        };
        store.load_keys().await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load_keys(&self) -> Result<(), KeyringError> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| {
            KeyringError::BackendError(format!("failed to read keyring directory: {e}"))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            KeyringError::BackendError(format!("failed to read directory entry: {e}"))
        })? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match self.load_key(&path).await {
                Ok(info) => debug!(name = %info.name, "loaded key"),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping key file"),
            }
        }
        Ok(())
    }

    async fn load_key(&self, path: &Path) -> Result<KeyInfo, KeyringError> {
        let data = fs::read_to_string(path)
            .await
            .map_err(|e| KeyringError::BackendError(format!("failed to read key file: {e}")))?;
        let file: EncryptedKeyFile = serde_json::from_str(&data)
            .map_err(|e| KeyringError::BackendError(format!("failed to parse key file: {e}")))?;

        let key = self.decrypt_key(&file)?;
        let info = KeyInfo::from_private_key(&file.name, &key);
        if info.pubkey != file.pubkey || info.address.to_string() != file.address {
            return Err(KeyringError::BackendError(format!(
                "key file {} does not match its secret",
                file.name
            )));
        }

        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.name.clone(), (info.clone(), key));
        Ok(info)
    }

    fn cipher(&self, salt: &[u8]) -> Result<Aes256Gcm, KeyringError> {
        let mut key = Zeroizing::new([0u8; 32]);
        Argon2::default()
            .hash_password_into(self.password.as_bytes(), salt, key.as_mut_slice())
            .map_err(|e| KeyringError::BackendError(format!("failed to derive key: {e}")))?;
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice())))
    }

    fn encrypt_key(&self, name: &str, key: &PrivateKey) -> Result<EncryptedKeyFile, KeyringError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(&nonce, key.to_bytes().as_slice())
            .map_err(|e| KeyringError::BackendError(format!("failed to encrypt key: {e}")))?;

        let pubkey = key.public_key();
        Ok(EncryptedKeyFile {
            name: name.to_string(),
            key_type: KEY_TYPE.to_string(),
            encrypted_data: general_purpose::STANDARD.encode(ciphertext),
            nonce: general_purpose::STANDARD.encode(nonce),
            salt: general_purpose::STANDARD.encode(salt),
            pubkey,
            address: pubkey.to_address().to_string(),
        })
    }

    fn decrypt_key(&self, file: &EncryptedKeyFile) -> Result<PrivateKey, KeyringError> {
        if file.key_type != KEY_TYPE {
            return Err(KeyringError::BackendError(format!(
                "unsupported key type: {}",
                file.key_type
            )));
        }
        let decode = |field: &str, value: &str| {
            general_purpose::STANDARD
                .decode(value)
                .map_err(|e| KeyringError::BackendError(format!("invalid {field}: {e}")))
        };
        let salt = decode("salt", &file.salt)?;
        let nonce = decode("nonce", &file.nonce)?;
        let ciphertext = decode("encrypted data", &file.encrypted_data)?;
        if nonce.len() != 12 {
            return Err(KeyringError::BackendError("invalid nonce length".to_string()));
        }

        let plaintext = Zeroizing::new(
            self.cipher(&salt)?
                .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
                .map_err(|_| {
                    KeyringError::BackendError("failed to decrypt key (wrong password?)".to_string())
                })?,
        );
        PrivateKey::from_bytes(&plaintext)
            .map_err(|e| KeyringError::BackendError(e.to_string()))
    }

    fn key_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn store_key(&self, name: &str, key: PrivateKey) -> Result<KeyInfo, KeyringError> {
        validate_name(name)?;
        let path = self.key_path(name);
        if self.read_keys().contains_key(name) || fs::try_exists(&path).await.unwrap_or(false) {
            return Err(KeyringError::KeyExists(name.to_string()));
        }

        let file = self.encrypt_key(name, &key)?;
        let data = serde_json::to_string_pretty(&file)
            .map_err(|e| KeyringError::BackendError(format!("failed to serialize key: {e}")))?;
        fs::write(&path, data)
            .await
            .map_err(|e| KeyringError::BackendError(format!("failed to write key file: {e}")))?;

        let info = KeyInfo::from_private_key(name, &key);
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), (info.clone(), key));
        debug!(name = %name, address = %info.address, "stored key");
        Ok(info)
    }

    fn read_keys(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, (KeyInfo, PrivateKey)>> {
        self.keys.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyStore for FileKeyStore {
    fn key_by_address(&self, address: &AccAddress) -> Result<PrivateKey, KeyringError> {
        self.read_keys()
            .values()
            .find(|(info, _)| info.address == *address)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| KeyringError::KeyNotFound(address.to_string()))
    }

    fn key_by_name(&self, name: &str) -> Result<PrivateKey, KeyringError> {
        self.read_keys()
            .get(name)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| KeyringError::KeyNotFound(name.to_string()))
    }

    fn list(&self) -> Vec<KeyInfo> {
        self.read_keys()
            .values()
            .map(|(info, _)| info.clone())
            .collect()
    }
}

#[async_trait]
impl KeyWriter for FileKeyStore {
    async fn create_key(&self, name: &str) -> Result<(KeyInfo, Zeroizing<String>), KeyringError> {
        let mnemonic = hd::generate_mnemonic()?;
        let phrase = Zeroizing::new(mnemonic.to_string());
        let key = hd::derive_private_key_from_mnemonic(&phrase, None)?;
        let info = self.store_key(name, key).await?;
        Ok((info, phrase))
    }

    async fn import_mnemonic(&self, name: &str, mnemonic: &str) -> Result<KeyInfo, KeyringError> {
        let key = hd::derive_private_key_from_mnemonic(mnemonic, None)?;
        self.store_key(name, key).await
    }
}
