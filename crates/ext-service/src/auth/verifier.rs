//! Inter-server token verification.
//!
//! Decides whether a bearer token is a currently valid inter-server
//! credential issued by the name server.
//!
//! # Security
//!
//! - Only RS256 is accepted; the algorithm is fixed, never read from the token
//! - The signature is verified before any claim is trusted
//! - Tokens are size-checked before parsing (DoS prevention)
//! - The raw token is never logged

use crate::auth::claims::ClaimSet;
use crate::auth::key_store::KeyProvider;
use crate::config::Config;
use common::jwt::check_token_size;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Verification failure.
///
/// Every variant maps to the same 401 response; the variant only affects
/// logging and metrics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no bearer token presented")]
    MissingToken,

    #[error("token is malformed or its signature does not verify")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("issuer mismatch: expected {expected}, observed {observed}")]
    IssuerMismatch { expected: String, observed: String },

    #[error("client mismatch: expected {expected}, observed {observed}")]
    ClientMismatch { expected: String, observed: String },

    #[error("verification key unavailable")]
    KeyUnavailable,
}

impl ValidationError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingToken => "missing_token",
            ValidationError::InvalidSignature => "invalid_signature",
            ValidationError::Expired => "expired",
            ValidationError::IssuerMismatch { .. } => "issuer_mismatch",
            ValidationError::ClientMismatch { .. } => "client_mismatch",
            ValidationError::KeyUnavailable => "key_unavailable",
        }
    }
}

/// Token verifier backed by a key provider.
pub struct TokenVerifier {
    keys: Arc<dyn KeyProvider>,
    expected_issuer: String,
    expected_client_id: Option<String>,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    ///
    /// * `keys` - Source of the verification key
    /// * `expected_issuer` - Required `iss` claim
    /// * `expected_client_id` - Required `sub` claim, `None` to skip the check
    /// * `leeway` - Tolerance applied to `exp`
    pub fn new(
        keys: Arc<dyn KeyProvider>,
        expected_issuer: String,
        expected_client_id: Option<String>,
        leeway: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = false;
        // Audience is not part of the inter-server contract
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            keys,
            expected_issuer,
            expected_client_id,
            validation,
        }
    }

    /// Create a verifier from service configuration.
    pub fn from_config(keys: Arc<dyn KeyProvider>, config: &Config) -> Self {
        Self::new(
            keys,
            config.jwt_issuer.clone(),
            config.expected_client_id.clone(),
            Duration::from_secs(config.jwt_leeway_seconds),
        )
    }

    /// Verify a bearer token and return its claims.
    ///
    /// # Checks, in order
    ///
    /// 1. Token present and non-empty
    /// 2. Verification key available
    /// 3. Size limit, structure and RS256 signature
    /// 4. Expiration
    /// 5. Issuer
    /// 6. Subject, when a client id is configured
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a `ValidationError`.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: Option<&str>) -> Result<ClaimSet, ValidationError> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ValidationError::MissingToken),
        };

        let key = self.keys.get_key().await.map_err(|e| {
            tracing::debug!(target: "ext.auth.verifier", error = %e, "No verification key");
            ValidationError::KeyUnavailable
        })?;

        check_token_size(token).map_err(|_| ValidationError::InvalidSignature)?;

        let claims = verify_signature(token, key.decoding_key(), &self.validation)?;

        if claims.iss != self.expected_issuer {
            return Err(ValidationError::IssuerMismatch {
                expected: self.expected_issuer.clone(),
                observed: claims.iss,
            });
        }

        if let Some(expected) = &self.expected_client_id {
            if &claims.sub != expected {
                return Err(ValidationError::ClientMismatch {
                    expected: expected.clone(),
                    observed: claims.sub,
                });
            }
        }

        tracing::debug!(target: "ext.auth.verifier", "Token verified");
        Ok(claims)
    }
}

/// Verify the RS256 signature, then `exp`, and decode the claims.
fn verify_signature(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<ClaimSet, ValidationError> {
    decode::<ClaimSet>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ValidationError::Expired,
            _ => {
                tracing::debug!(target: "ext.auth.verifier", error = %e, "Token rejected");
                ValidationError::InvalidSignature
            }
        })
}
