//! Authenticated inter-server identity.
//!
//! Built from a verified claim set and carried in the request extensions for
//! the duration of one request.

use crate::auth::claims::ClaimSet;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// Authority granted to every verified inter-server caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Authority {
    #[serde(rename = "inter-server")]
    InterServer,
}

impl Authority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Authority::InterServer => "inter-server",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of the claims, for logging and auditing.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ClaimSnapshot {
    pub issuer: String,
    pub subject: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for ClaimSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSnapshot")
            .field("issuer", &self.issuer)
            .field("subject", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity of a verified calling service.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    subject: String,
    authority: Authority,
    claims: ClaimSnapshot,
}

impl AuthenticatedIdentity {
    /// Build the identity from a verified claim set.
    pub fn from_claims(claims: ClaimSet) -> Self {
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single();

        Self {
            subject: claims.sub.clone(),
            authority: Authority::InterServer,
            claims: ClaimSnapshot {
                issuer: claims.iss,
                subject: claims.sub,
                expires_at,
            },
        }
    }

    /// Calling client id.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn claims(&self) -> &ClaimSnapshot {
        &self.claims
    }
}

impl From<ClaimSet> for AuthenticatedIdentity {
    fn from(claims: ClaimSet) -> Self {
        Self::from_claims(claims)
    }
}

impl fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("subject", &"[REDACTED]")
            .field("authority", &self.authority)
            .field("claims", &self.claims)
            .finish()
    }
}
