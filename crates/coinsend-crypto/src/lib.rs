//! Cryptography for coinsend
//!
//! secp256k1 is the only key type: it is what Cosmos SDK accounts use by
//! default, and every signature here is a 64 byte `r || s` over the SHA-256
//! digest of the sign bytes.

pub mod keys;
pub mod sign_doc;
pub mod signature;
pub mod verify;

pub use keys::{KeyError, PrivateKey, PublicKey};
pub use sign_doc::{canonical_json, SignDocCodec, SignDocError, SignerData};
pub use signature::{sign_message, verify_signature, SignatureError};
pub use verify::{TransactionVerifier, VerificationError};
