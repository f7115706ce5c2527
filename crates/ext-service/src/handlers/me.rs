//! Caller identity handler.
//!
//! Returns the authenticated inter-server identity installed by the gate.

use crate::auth::AuthenticatedIdentity;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Response for `GET {prefix}/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    /// Calling client id.
    pub subject: String,

    /// Granted authority ("inter-server").
    pub authority: String,

    /// Token issuer.
    pub issuer: String,

    /// Token expiration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Handler for GET {prefix}/me
///
/// ## Response
///
/// ```json
/// {
///   "subject": "client-42",
///   "authority": "inter-server",
///   "issuer": "dg-name-server",
///   "expires_at": "2025-01-15T12:05:00Z"
/// }
/// ```
#[instrument(skip_all, name = "ext.handlers.me")]
pub async fn get_me(Extension(identity): Extension<AuthenticatedIdentity>) -> Json<MeResponse> {
    tracing::debug!(target: "ext.handlers.me", "Returning caller identity");

    Json(MeResponse {
        subject: identity.subject().to_string(),
        authority: identity.authority().to_string(),
        issuer: identity.claims().issuer.clone(),
        expires_at: identity.claims().expires_at,
    })
}
