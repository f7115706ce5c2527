//! Builder patterns for test tokens
//!
//! Provides a fluent API for signed inter-server tokens.

use crate::crypto_fixtures::{test_keypair, TestKeypair};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};

/// Issuer the test harness configures as trusted.
pub const TEST_ISSUER: &str = "dg-name-server";

/// Client id the test harness configures as expected.
pub const TEST_CLIENT_ID: &str = "client-42";

/// Builder for signed inter-server test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .subject("client-7")
///     .expires_in_seconds(-300)
///     .build();
/// ```
pub struct TestTokenBuilder {
    iss: Option<String>,
    sub: String,
    iat: Option<i64>,
    exp: Option<i64>,
}

impl TestTokenBuilder {
    /// Create a new token builder: trusted issuer, expected client, valid
    /// for five minutes.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: Some(TEST_ISSUER.to_string()),
            sub: TEST_CLIENT_ID.to_string(),
            iat: Some(now.timestamp()),
            exp: Some((now + Duration::seconds(300)).timestamp()),
        }
    }

    /// Set the issuer
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Omit the `iss` claim
    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Set the subject (calling client id)
    pub fn subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration relative to now; negative values are in the past
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Omit the `exp` claim
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Omit the `iat` claim
    pub fn without_issued_at(mut self) -> Self {
        self.iat = None;
        self
    }

    /// Claims as a JSON object
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        if let Some(iss) = &self.iss {
            claims.insert("iss".to_string(), Value::from(iss.clone()));
        }
        claims.insert("sub".to_string(), Value::from(self.sub.clone()));
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), Value::from(iat));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), Value::from(exp));
        }
        Value::Object(claims)
    }

    /// Sign with the trusted key
    pub fn build(self) -> String {
        self.sign_with(test_keypair())
    }

    /// Sign with a specific key pair (RS256)
    pub fn sign_with(self, keypair: &TestKeypair) -> String {
        keypair.sign(&self.claims())
    }

    /// Sign with a shared secret (HS256), for algorithm confusion tests
    pub fn sign_hs256(self, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims(),
            &EncodingKey::from_secret(secret),
        )
        .expect("Failed to sign HS256 test token")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
