//! BIP39 mnemonics and BIP32/BIP44 derivation along the Cosmos path
//! `m/44'/118'/0'/0/0`.

use crate::KeyringError;
use bip39::{Language, Mnemonic};
use coinsend_crypto::PrivateKey;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::PrimeField;
use k256::{ecdsa::SigningKey, FieldBytes, Scalar};
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

const HARDENED: u32 = 1 << 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    indices: Vec<u32>,
}

impl DerivationPath {
    /// Parse a path such as `m/44'/118'/0'/0/0`. `'` and `h` mark hardened
    /// components.
    pub fn parse(path: &str) -> Result<Self, KeyringError> {
        let rest = path
            .strip_prefix("m/")
            .or_else(|| path.strip_prefix("M/"))
            .ok_or_else(|| invalid_path(path))?;

        let mut indices = Vec::new();
        for component in rest.split('/').filter(|c| !c.is_empty()) {
            let (digits, hardened) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
            {
                Some(digits) => (digits, true),
                None => (component, false),
            };
            let index: u32 = digits.parse().map_err(|_| invalid_path(path))?;
            if index >= HARDENED {
                return Err(invalid_path(path));
            }
            indices.push(if hardened { index | HARDENED } else { index });
        }
        Ok(Self { indices })
    }

    pub fn cosmos(account: u32, address_index: u32) -> Result<Self, KeyringError> {
        Self::parse(&format!("m/44'/118'/{account}'/0/{address_index}"))
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

fn invalid_path(path: &str) -> KeyringError {
    KeyringError::BackendError(format!("invalid derivation path: {path}"))
}

/// BIP32 extended private key
struct ExtendedKey {
    key: SigningKey,
    chain_code: Zeroizing<[u8; 32]>,
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self, KeyringError> {
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| KeyringError::BackendError(e.to_string()))?;
        mac.update(seed);
        Self::split(&mac.finalize().into_bytes())
    }

    fn split(output: &[u8]) -> Result<Self, KeyringError> {
        let key = SigningKey::from_slice(&output[..32])
            .map_err(|_| KeyringError::BackendError("derived key is out of range".to_string()))?;
        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&output[32..]);
        Ok(Self { key, chain_code })
    }

    fn derive_child(&self, index: u32) -> Result<Self, KeyringError> {
        let mut mac = HmacSha512::new_from_slice(self.chain_code.as_slice())
            .map_err(|e| KeyringError::BackendError(e.to_string()))?;
        if index & HARDENED != 0 {
            mac.update(&[0x00]);
            mac.update(&self.key.to_bytes());
        } else {
            mac.update(self.key.verifying_key().to_encoded_point(true).as_bytes());
        }
        mac.update(&index.to_be_bytes());
        let output = mac.finalize().into_bytes();

        // child = parse256(IL) + parent (mod n)
        let tweak = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(
            &output[..32],
        )))
        .ok_or_else(|| KeyringError::BackendError("derived tweak is out of range".to_string()))?;
        let parent: Scalar = **self.key.as_nonzero_scalar();
        let child = tweak + parent;
        let key = SigningKey::from_bytes(&child.to_repr())
            .map_err(|_| KeyringError::BackendError("derived key is zero".to_string()))?;

        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&output[32..]);
        Ok(Self { key, chain_code })
    }
}

pub fn derive_private_key_from_mnemonic(
    mnemonic: &str,
    path: Option<&DerivationPath>,
) -> Result<PrivateKey, KeyringError> {
    let mnemonic = Mnemonic::parse_in(Language::English, mnemonic)
        .map_err(|_| KeyringError::InvalidMnemonic)?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));

    let default_path;
    let path = match path {
        Some(path) => path,
        None => {
            default_path = DerivationPath::parse(COSMOS_HD_PATH)?;
            &default_path
        }
    };

    let mut current = ExtendedKey::master(seed.as_slice())?;
    for index in path.indices() {
        current = current.derive_child(*index)?;
    }
    Ok(PrivateKey::from(current.key))
}

/// New 24 word English mnemonic from 256 bits of OS entropy
pub fn generate_mnemonic() -> Result<Mnemonic, KeyringError> {
    let mut entropy = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(entropy.as_mut_slice());
    Mnemonic::from_entropy(entropy.as_slice())
        .map_err(|e| KeyringError::BackendError(format!("failed to generate mnemonic: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_derivation_path_parsing() {
        let path = DerivationPath::parse(COSMOS_HD_PATH).unwrap();
        assert_eq!(
            path.indices(),
            &[44 | HARDENED, 118 | HARDENED, HARDENED, 0, 0]
        );
        assert_eq!(DerivationPath::parse("m/44h/118h/0h/0/0").unwrap(), path);
        assert_eq!(DerivationPath::cosmos(0, 0).unwrap(), path);

        assert!(DerivationPath::parse("44'/118'").is_err());
        assert!(DerivationPath::parse("m/abc").is_err());
        assert!(DerivationPath::parse("m/2147483648'").is_err());
    }

    #[test]
    fn test_known_cosmos_address() {
        let key = derive_private_key_from_mnemonic(ABANDON, None).unwrap();
        let address = key.public_key().to_address().to_bech32("cosmos").unwrap();
        assert_eq!(address, "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4");
    }

    #[test]
    fn test_paths_produce_different_keys() {
        let default = derive_private_key_from_mnemonic(ABANDON, None).unwrap();
        let other =
            derive_private_key_from_mnemonic(ABANDON, Some(&DerivationPath::cosmos(1, 0).unwrap()))
                .unwrap();
        assert_ne!(default.public_key(), other.public_key());
    }

    #[test]
    fn test_invalid_mnemonic() {
        assert_eq!(
            derive_private_key_from_mnemonic("not a mnemonic", None).unwrap_err(),
            KeyringError::InvalidMnemonic
        );
    }

    #[test]
    fn test_generated_mnemonic_round_trips() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 24);
        assert!(derive_private_key_from_mnemonic(&mnemonic.to_string(), None).is_ok());
    }
}
