//! Inter-server authentication gate for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it, and
//! injects the resulting `AuthenticatedIdentity` into request extensions.
//! Every failure produces the same 401; the reason is only logged.

use crate::auth::{AuthenticatedIdentity, TokenVerifier, ValidationError};
use crate::errors::ExtError;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Authorization scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// State for the authentication gate.
#[derive(Clone)]
pub struct AuthState {
    /// Verifier backed by the public key store.
    pub verifier: Arc<TokenVerifier>,
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` when the header is absent, not valid ASCII, or uses a
/// different scheme. The verifier turns `None` into `MissingToken`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

/// Authentication gate middleware.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 Unauthorized with WWW-Authenticate header for any verification failure
/// - Otherwise runs the inner handler with the identity in extensions
#[instrument(skip(state, req, next), name = "ext.middleware.auth")]
pub async fn require_inter_server_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ExtError> {
    let outcome = {
        let token = bearer_token(req.headers());
        state.verifier.verify(token).await
    };

    let claims = outcome.map_err(|e| {
        log_rejection(&e);
        metrics::record_auth_request("rejected", e.kind());
        ExtError::Unauthorized
    })?;

    let identity = AuthenticatedIdentity::from_claims(claims);
    tracing::debug!(
        target: "ext.middleware.auth",
        authority = %identity.authority(),
        "Inter-server request authorized"
    );
    metrics::record_auth_request("accepted", "none");

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Log a rejection at a level matching its operational meaning.
///
/// Key unavailability is infrastructure trouble; bad tokens are noise.
fn log_rejection(err: &ValidationError) {
    match err {
        ValidationError::KeyUnavailable => {
            tracing::error!(
                target: "ext.middleware.auth",
                kind = err.kind(),
                "Rejected inter-server request: verification key unavailable"
            );
        }
        ValidationError::MissingToken => {
            tracing::debug!(
                target: "ext.middleware.auth",
                kind = err.kind(),
                "Rejected inter-server request without bearer token"
            );
        }
        ValidationError::IssuerMismatch { expected, observed }
        | ValidationError::ClientMismatch { expected, observed } => {
            tracing::warn!(
                target: "ext.middleware.auth",
                kind = err.kind(),
                expected = %expected,
                observed = %observed,
                "Rejected inter-server request"
            );
        }
        ValidationError::InvalidSignature | ValidationError::Expired => {
            tracing::warn!(
                target: "ext.middleware.auth",
                kind = err.kind(),
                "Rejected inter-server request"
            );
        }
    }
}
