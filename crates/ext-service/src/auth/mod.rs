//! Inter-server authentication.
//!
//! - `key_store`: fetches and caches the name server's RSA public key
//! - `verifier`: verifies bearer tokens against that key
//! - `identity`: the authenticated identity handed to handlers

pub mod claims;
pub mod identity;
pub mod key_store;
pub mod verifier;

pub use claims::ClaimSet;
pub use identity::{AuthenticatedIdentity, Authority};
pub use key_store::{CachedPublicKey, KeyProvider, KeyStoreError, PublicKeyStore};
pub use verifier::{TokenVerifier, ValidationError};
