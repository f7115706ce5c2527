//! JWT utilities for inter-server token verification.
//!
//! This module provides the pieces of token verification that do not depend
//! on service state:
//! - Size limits for DoS prevention
//! - Leeway bounds for `exp` validation
//! - Decoding of the name server's public key payload into RSA key material
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RSA public keys are accepted from the key endpoint
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{check_token_size, decode_rsa_public_key};
//!
//! let pkcs1_der = decode_rsa_public_key(&response_body)?;
//! let decoding_key = DecodingKey::from_rsa_der(&pkcs1_der);
//!
//! check_token_size(token)?;
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::der::Decode;
use rsa::pkcs8::spki::SubjectPublicKeyInfoRef;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any parsing or cryptographic
/// operations. A typical RS256 inter-server token is 400-700 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default leeway applied to `exp` validation.
///
/// Zero: a token is expired the second its `exp` passes.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(0);

/// Maximum configurable leeway (10 minutes).
pub const MAX_LEEWAY: Duration = Duration::from_secs(600);

/// Maximum accepted size of a public key response body (64KB).
///
/// A base64 X.509 RSA-4096 key is under 1KB.
pub const MAX_PUBLIC_KEY_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Error Types
// =============================================================================

/// Errors from pre-parse token checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,
}

/// Errors from decoding the public key payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyDecodeError {
    /// Payload was empty after trimming.
    #[error("public key payload is empty")]
    Empty,

    /// Payload looked like a JSON string but did not parse as one.
    #[error("public key payload is not a valid JSON string: {0}")]
    Json(String),

    /// Payload is not valid standard base64.
    #[error("public key payload is not valid base64: {0}")]
    Base64(String),

    /// Decoded bytes are not a SubjectPublicKeyInfo structure.
    #[error("public key is not X.509 SubjectPublicKeyInfo DER: {0}")]
    Spki(String),

    /// SubjectPublicKeyInfo carries a non-RSA algorithm.
    #[error("public key algorithm {0} is not RSA")]
    NotRsa(String),

    /// RSA key material is structurally invalid.
    #[error("invalid RSA public key: {0}")]
    InvalidRsa(String),
}

// =============================================================================
// Functions
// =============================================================================

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` when the token exceeds the limit.
pub fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Decode the name server's public key payload into PKCS#1 RSA DER.
///
/// The payload is a base64 (standard alphabet) X.509 `SubjectPublicKeyInfo`
/// DER document. It may arrive as plain text, as a JSON string literal, or
/// wrapped in PEM armour lines; all three are accepted.
///
/// The returned bytes are suitable for `jsonwebtoken::DecodingKey::from_rsa_der`.
///
/// # Errors
///
/// Returns a `PublicKeyDecodeError` describing the first stage that failed.
pub fn decode_rsa_public_key(payload: &str) -> Result<Vec<u8>, PublicKeyDecodeError> {
    let trimmed = payload.trim();

    let unquoted = if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed)
            .map_err(|e| PublicKeyDecodeError::Json(e.to_string()))?
    } else {
        trimmed.to_string()
    };

    // Strip PEM header/footer lines and any embedded whitespace
    let b64: String = unquoted
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .flat_map(|line| line.chars().filter(|c| !c.is_whitespace()))
        .collect();

    if b64.is_empty() {
        return Err(PublicKeyDecodeError::Empty);
    }

    let der = STANDARD
        .decode(b64.as_bytes())
        .map_err(|e| PublicKeyDecodeError::Base64(e.to_string()))?;

    let spki = SubjectPublicKeyInfoRef::from_der(&der)
        .map_err(|e| PublicKeyDecodeError::Spki(e.to_string()))?;

    if spki.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(PublicKeyDecodeError::NotRsa(spki.algorithm.oid.to_string()));
    }

    let public_key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| PublicKeyDecodeError::InvalidRsa(e.to_string()))?;

    let pkcs1 = public_key
        .to_pkcs1_der()
        .map_err(|e| PublicKeyDecodeError::InvalidRsa(e.to_string()))?;

    Ok(pkcs1.as_bytes().to_vec())
}

// =============================================================================
// Tests
// =============================================================================
