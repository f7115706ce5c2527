//! RSA cryptographic fixtures for testing
//!
//! Provides two process-wide RSA-2048 key pairs: the trusted key served by
//! the mock key endpoint, and an untrusted key for forged-token tests.
//! Keys are generated once per test binary.

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use std::sync::OnceLock;

/// RSA key size for fixtures (ring rejects anything smaller).
pub const TEST_RSA_BITS: usize = 2048;

/// RSA key pair used to sign test tokens.
pub struct TestKeypair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl TestKeypair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), TEST_RSA_BITS)
            .expect("Failed to generate RSA test key");
        let public_key = private_key.to_public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Public key as base64 X.509 SubjectPublicKeyInfo DER, the format the
    /// name server's key endpoint serves.
    pub fn public_key_spki_base64(&self) -> String {
        let der = self
            .public_key
            .to_public_key_der()
            .expect("Failed to encode SPKI DER");
        STANDARD.encode(der.as_bytes())
    }

    /// Public key as PKCS#1 DER.
    pub fn public_key_pkcs1_der(&self) -> Vec<u8> {
        self.public_key
            .to_pkcs1_der()
            .expect("Failed to encode PKCS#1 DER")
            .as_bytes()
            .to_vec()
    }

    /// Signing key for `jsonwebtoken`.
    pub fn encoding_key(&self) -> EncodingKey {
        let pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("Failed to encode PKCS#8 PEM");
        EncodingKey::from_rsa_pem(pem.as_bytes()).expect("Failed to build RSA encoding key")
    }

    /// Sign arbitrary claims with RS256.
    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key())
            .expect("Failed to sign test token")
    }
}

/// The trusted key pair, served by `TestKeyServer`.
pub fn test_keypair() -> &'static TestKeypair {
    static KEYPAIR: OnceLock<TestKeypair> = OnceLock::new();
    KEYPAIR.get_or_init(TestKeypair::generate)
}

/// A key pair the service has never seen.
pub fn other_keypair() -> &'static TestKeypair {
    static KEYPAIR: OnceLock<TestKeypair> = OnceLock::new();
    KEYPAIR.get_or_init(TestKeypair::generate)
}
