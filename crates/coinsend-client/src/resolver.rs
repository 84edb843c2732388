//! Mapping a sender address to the key that signs for it

use coinsend_crypto::PrivateKey;
use coinsend_keyring::{KeyStore, KeyringError};
use coinsend_log::debug;
use coinsend_types::AccAddress;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no key for address {0}")]
    KeyNotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Finds the private key whose derived address is `address`.
///
/// Implementations must be safe to call concurrently and must never hand
/// back a key that derives a different address.
pub trait AddressResolver: Send + Sync {
    fn resolve(&self, address: &AccAddress) -> Result<PrivateKey, ResolveError>;
}

fn ensure_derives(key: PrivateKey, address: &AccAddress) -> Result<PrivateKey, ResolveError> {
    if key.public_key().to_address() == *address {
        Ok(key)
    } else {
        Err(ResolveError::KeyNotFound(address.to_string()))
    }
}

/// Holds exactly one key and answers only for its own address.
#[derive(Clone)]
pub struct SingleKeyResolver {
    key: PrivateKey,
    address: AccAddress,
}

impl SingleKeyResolver {
    pub fn new(key: PrivateKey) -> Self {
        let address = key.public_key().to_address();
        Self { key, address }
    }

    pub fn address(&self) -> &AccAddress {
        &self.address
    }
}

impl fmt::Debug for SingleKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleKeyResolver")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl AddressResolver for SingleKeyResolver {
    fn resolve(&self, address: &AccAddress) -> Result<PrivateKey, ResolveError> {
        if *address != self.address {
            return Err(ResolveError::KeyNotFound(address.to_string()));
        }
        Ok(self.key.clone())
    }
}

/// Looks keys up in an injected [`KeyStore`].
#[derive(Clone)]
pub struct KeyStoreResolver {
    store: Arc<dyn KeyStore>,
}

impl KeyStoreResolver {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }
}

impl AddressResolver for KeyStoreResolver {
    fn resolve(&self, address: &AccAddress) -> Result<PrivateKey, ResolveError> {
        match self.store.key_by_address(address) {
            Ok(key) => ensure_derives(key, address),
            Err(KeyringError::KeyNotFound(_)) => {
                Err(ResolveError::KeyNotFound(address.to_string()))
            }
            Err(e) => Err(ResolveError::Backend(e.to_string())),
        }
    }
}

/// A key management system that can release signing keys by address.
pub trait CustodyBackend: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` means the backend holds no key for `address`.
    fn fetch_key(&self, address: &AccAddress) -> Result<Option<PrivateKey>, ResolveError>;
}

/// Placeholder backend used until a custody system is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredCustody;

impl CustodyBackend for UnconfiguredCustody {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn fetch_key(&self, _address: &AccAddress) -> Result<Option<PrivateKey>, ResolveError> {
        Ok(None)
    }
}

/// Resolves through an external custody backend.
#[derive(Debug, Default)]
pub struct CustodyResolver<B = UnconfiguredCustody> {
    backend: B,
}

impl<B: CustodyBackend> CustodyResolver<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: CustodyBackend> AddressResolver for CustodyResolver<B> {
    fn resolve(&self, address: &AccAddress) -> Result<PrivateKey, ResolveError> {
        match self.backend.fetch_key(address)? {
            Some(key) => ensure_derives(key, address),
            None => {
                debug!(backend = self.backend.name(), %address, "custody holds no key");
                Err(ResolveError::KeyNotFound(address.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsend_keyring::MemoryKeyStore;

    const ALICE: &str = "1e99423a4ed27608a15a2616a2b0e9e52ced330ac530edcc32c8ffc6a526aedd";
    const BOB: &str = "c87509a1c067bbde78beb793e6fa76530b6382a4c0241e5e4a9ec0a0f44dc0d3";

    fn key(secret: &str) -> PrivateKey {
        PrivateKey::from_hex(secret).unwrap()
    }

    #[test]
    fn test_single_key_resolver() {
        let alice = key(ALICE);
        let resolver = SingleKeyResolver::new(alice.clone());
        let addr = alice.public_key().to_address();

        let resolved = resolver.resolve(&addr).unwrap();
        assert_eq!(resolved.public_key(), alice.public_key());

        let bob_addr = key(BOB).public_key().to_address();
        assert!(matches!(
            resolver.resolve(&bob_addr),
            Err(ResolveError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_key_store_resolver() {
        let store = Arc::new(MemoryKeyStore::new());
        let info = store.insert("alice", key(ALICE)).unwrap();
        let resolver = KeyStoreResolver::new(store);

        let resolved = resolver.resolve(&info.address).unwrap();
        assert_eq!(resolved.public_key().to_address(), info.address);

        let bob_addr = key(BOB).public_key().to_address();
        match resolver.resolve(&bob_addr) {
            Err(ResolveError::KeyNotFound(addr)) => assert_eq!(addr, bob_addr.to_string()),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    struct WrongKeyCustody;

    impl CustodyBackend for WrongKeyCustody {
        fn name(&self) -> &str {
            "wrong"
        }

        fn fetch_key(&self, _address: &AccAddress) -> Result<Option<PrivateKey>, ResolveError> {
            Ok(Some(key(BOB)))
        }
    }

    #[test]
    fn test_custody_resolver() {
        let addr = key(ALICE).public_key().to_address();

        let unconfigured = CustodyResolver::<UnconfiguredCustody>::default();
        assert!(matches!(
            unconfigured.resolve(&addr),
            Err(ResolveError::KeyNotFound(_))
        ));

        // a backend returning someone else's key is treated as a miss
        let wrong = CustodyResolver::new(WrongKeyCustody);
        assert!(matches!(
            wrong.resolve(&addr),
            Err(ResolveError::KeyNotFound(_))
        ));
    }
}
