//! Inter-server JWT claims.
//!
//! Contains the claims extracted from verified tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claim set of a verified inter-server token.
///
/// Only constructed by the verifier after the signature has been checked.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Issuer. Missing issuers deserialize as empty and fail the issuer check.
    #[serde(default)]
    pub iss: String,

    /// Subject (calling client id) - redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}
